use crate::model_service::Detection;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use service_core::{decode_image, InferenceError};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const JPEG_QUALITY: u8 = 90;

fn line_thickness(img: &RgbImage) -> u32 {
    (img.width().min(img.height()) / 200).max(2)
}

fn draw_detection(img: &mut RgbImage, detection: &Detection, thickness: u32) {
    let x = detection.x1.round() as i32;
    let y = detection.y1.round() as i32;
    let width = (detection.x2 - detection.x1).round() as i32;
    let height = (detection.y2 - detection.y1).round() as i32;

    // Nested one-pixel outlines, shrinking inwards.
    for offset in 0..thickness as i32 {
        let w = width - 2 * offset;
        let h = height - 2 * offset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x + offset, y + offset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }
}

/// Draws every detection onto the uploaded image and re-encodes it as JPEG.
pub fn annotate_image(
    image_data: &[u8],
    detections: &[Detection],
) -> Result<Vec<u8>, InferenceError> {
    let mut img = decode_image(image_data)?.to_rgb8();
    let thickness = line_thickness(&img);

    for detection in detections {
        draw_detection(&mut img, detection, thickness);
    }

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
        .encode_image(&img)
        .map_err(|e| InferenceError::Output(format!("failed to encode annotated image: {}", e)))?;

    Ok(buffer)
}
