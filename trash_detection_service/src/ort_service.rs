use crate::{
    config::DetectorConfig,
    model_service::{Detection, ModelService},
};
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array, ArrayD, Axis, Ix2, Ix4};
use service_core::{decode_image, InferenceError, SessionPool};

fn intersection(box1: &Detection, box2: &Detection) -> f32 {
    let width = (box1.x2.min(box2.x2) - box1.x1.max(box2.x1)).max(0.);
    let height = (box1.y2.min(box2.y2) - box1.y1.max(box2.y1)).max(0.);
    width * height
}

fn union(box1: &Detection, box2: &Detection) -> f32 {
    ((box1.x2 - box1.x1) * (box1.y2 - box1.y1)) + ((box2.x2 - box2.x1) * (box2.y2 - box2.y1))
        - intersection(box1, box2)
}

fn iou(box1: &Detection, box2: &Detection) -> f32 {
    let union = union(box1, box2);
    if union <= 0. {
        return 0.;
    }
    intersection(box1, box2) / union
}

fn transform_image(image: &DynamicImage, size: u32) -> Array<f32, Ix4> {
    let img = image.resize_exact(size, size, FilterType::CatmullRom);

    let mut input = Array::zeros((1, 3, size as usize, size as usize));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

/// Turns a `[1, 4 + classes, candidates]` tensor into boxes scaled to the
/// original `(width, height)`. Rows 0..4 are centre x, centre y, width, height
/// in model input pixels.
fn decode_output(
    output: &ArrayD<f32>,
    input_size: u32,
    (img_width, img_height): (u32, u32),
    min_probability: f32,
) -> Result<Vec<Detection>, InferenceError> {
    if output.ndim() != 3 || output.shape()[0] != 1 || output.shape()[1] <= 4 {
        return Err(InferenceError::Output(format!(
            "expected shape [1, 4 + classes, candidates], got {:?}",
            output.shape()
        )));
    }

    let candidates = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| InferenceError::Output(e.to_string()))?;

    let scale_x = img_width as f32 / input_size as f32;
    let scale_y = img_height as f32 / input_size as f32;

    let mut boxes = Vec::new();
    for column in candidates.axis_iter(Axis(1)) {
        let Some((class_id, prob)) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
        else {
            continue;
        };

        if prob < min_probability {
            continue;
        }

        let xc = column[0] * scale_x;
        let yc = column[1] * scale_y;
        let w = column[2] * scale_x;
        let h = column[3] * scale_y;

        boxes.push(Detection {
            class_id,
            confidence: prob,
            x1: (xc - w / 2.).max(0.),
            y1: (yc - h / 2.).max(0.),
            x2: (xc + w / 2.).min(img_width as f32),
            y2: (yc + h / 2.).min(img_height as f32),
        });
    }

    Ok(boxes)
}

/// Greedy NMS: keeps the most confident box and drops every remaining box
/// whose IoU with it reaches `iou_threshold`.
fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));
    let mut result = Vec::new();

    while let Some((&best, rest)) = boxes.split_first() {
        result.push(best);
        boxes = rest
            .iter()
            .filter(|other| iou(&best, other) < iou_threshold)
            .copied()
            .collect();
    }

    result
}

#[derive(Clone)]
pub struct OrtModelService {
    pool: SessionPool,
    input_size: u32,
    min_probability: f32,
    iou_threshold: f32,
}

impl OrtModelService {
    pub fn new(model_config: &DetectorConfig) -> Result<Self, InferenceError> {
        Ok(Self {
            pool: SessionPool::new(&model_config.get_path(), model_config.num_instances)?,
            input_size: model_config.input_size,
            min_probability: model_config.min_probability,
            iou_threshold: model_config.iou_threshold,
        })
    }

    fn detect_blocking(&self, image_data: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        let image = decode_image(image_data)?;
        let input = transform_image(&image, self.input_size);
        let output = self.pool.run(&input)?;

        let boxes = decode_output(
            &output,
            self.input_size,
            image.dimensions(),
            self.min_probability,
        )?;
        tracing::debug!("{} candidates above threshold", boxes.len());

        Ok(non_max_suppression(boxes, self.iou_threshold))
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn detect(&self, image_data: Vec<u8>) -> Result<Vec<Detection>, InferenceError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.detect_blocking(&image_data))
            .await
            .map_err(|e| InferenceError::Inference(format!("inference task failed: {}", e)))?
    }
}
