use crate::error::InferenceError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage, InferenceError> {
    let image_reader = ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| InferenceError::InvalidImage(e.to_string()))?;

    image_reader
        .decode()
        .map_err(|e| InferenceError::InvalidImage(e.to_string()))
}

/// Sniffs the container format without decoding pixels.
pub fn detect_format(image_data: &[u8]) -> Result<ImageFormat, InferenceError> {
    image::guess_format(image_data).map_err(|e| InferenceError::InvalidImage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};

    #[test]
    fn test_decode_png() {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(12, 7, Rgb([255, 0, 0]));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();

        let decoded = decode_image(cursor.get_ref()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"\xFF\xD8\xFF\xE0rest").unwrap(), ImageFormat::Jpeg);
        assert!(matches!(
            detect_format(b"plain text"),
            Err(InferenceError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_image(b"not an image at all");
        assert!(matches!(result, Err(InferenceError::InvalidImage(_))));
    }
}
