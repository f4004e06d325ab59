use crate::{
    config::ModelConfig,
    labels::load_class_labels,
    model_service::{Classification, ModelService},
};
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array, ArrayD, Ix4};
use service_core::{decode_image, InferenceError, SessionPool};
use std::sync::Arc;

/// Resizes to `size`x`size` and lays the RGB pixels out as NHWC `[1, size, size, 3]` in `[0, 1]`.
fn transform_image(image: &DynamicImage, size: u32) -> Array<f32, Ix4> {
    let img = image
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let mut input = Array::zeros((1, size as usize, size as usize, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        input[[0, y, x, 0]] = (r as f32) / 255.;
        input[[0, y, x, 1]] = (g as f32) / 255.;
        input[[0, y, x, 2]] = (b as f32) / 255.;
    }

    input
}

fn top_class(output: &ArrayD<f32>) -> Option<(usize, f32)> {
    output
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((index, score)),
        })
}

#[derive(Clone)]
pub struct OrtModelService {
    pool: SessionPool,
    labels: Arc<Vec<String>>,
    input_size: u32,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, InferenceError> {
        let labels = load_class_labels(&model_config.get_labels_path()).map_err(|e| {
            InferenceError::SessionInit(format!("failed to load class labels: {}", e))
        })?;
        let pool = SessionPool::new(&model_config.get_path(), model_config.num_instances)?;

        tracing::info!("Loaded {} class labels", labels.len());

        Ok(Self {
            pool,
            labels: Arc::new(labels),
            input_size: model_config.input_size,
        })
    }

    fn classify_blocking(&self, image_data: &[u8]) -> Result<Classification, InferenceError> {
        let image = decode_image(image_data)?;
        let input = transform_image(&image, self.input_size);
        let output = self.pool.run(&input)?;

        let (class_index, confidence) = top_class(&output)
            .ok_or_else(|| InferenceError::Output("model returned an empty tensor".into()))?;
        let label = self.labels.get(class_index).cloned().ok_or_else(|| {
            InferenceError::Output(format!(
                "class index {} outside of {} labels",
                class_index,
                self.labels.len()
            ))
        })?;

        Ok(Classification {
            class_index,
            label,
            confidence,
        })
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn classify(&self, image_data: Vec<u8>) -> Result<Classification, InferenceError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.classify_blocking(&image_data))
            .await
            .map_err(|e| InferenceError::Inference(format!("inference task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use ndarray::arr2;

    #[test]
    fn test_transform_image_is_nhwc() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        img.put_pixel(0, 0, Rgb([0, 0, 255]));
        let input = transform_image(&DynamicImage::ImageRgb8(img), 8);

        assert_eq!(input.shape(), &[1, 8, 8, 3]);
        assert_eq!(input[[0, 0, 0, 2]], 1.0);
        assert_eq!(input[[0, 0, 0, 0]], 0.0);
        assert_eq!(input[[0, 7, 7, 0]], 1.0);
        assert!(input.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_transform_image_resizes() {
        let img = RgbImage::from_pixel(300, 120, Rgb([10, 20, 30]));
        let input = transform_image(&DynamicImage::ImageRgb8(img), 64);

        assert_eq!(input.shape(), &[1, 64, 64, 3]);
    }

    #[test]
    fn test_top_class() {
        let output = arr2(&[[0.1_f32, 0.7, 0.2]]).into_dyn();
        assert_eq!(top_class(&output), Some((1, 0.7)));
    }

    #[test]
    fn test_top_class_keeps_first_on_tie() {
        let output = arr2(&[[0.4_f32, 0.4, 0.2]]).into_dyn();
        assert_eq!(top_class(&output).map(|(i, _)| i), Some(0));

        let empty = ArrayD::<f32>::zeros(vec![1, 0]);
        assert_eq!(top_class(&empty), None);
    }
}
