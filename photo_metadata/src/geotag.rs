use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

pub const UNKNOWN_DATE: &str = "Unknown";

/// Location and capture date pulled from an image's EXIF block.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_created: String,
}

impl Default for PhotoMetadata {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            date_created: UNKNOWN_DATE.to_string(),
        }
    }
}

/// Reads GPS position and `DateTimeOriginal` from an encoded image.
///
/// Images without EXIF (or with a block that cannot be parsed) yield the
/// default metadata; the failure is only logged.
pub fn extract_metadata(image_data: &[u8]) -> PhotoMetadata {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(image_data)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            tracing::debug!("Image carries no EXIF data");
            return PhotoMetadata::default();
        }
        Err(e) => {
            tracing::warn!("Error reading EXIF data: {}", e);
            return PhotoMetadata::default();
        }
    };

    PhotoMetadata {
        latitude: read_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "N"),
        longitude: read_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "E"),
        date_created: read_ascii(&exif, Tag::DateTimeOriginal)
            .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
    }
}

/// Degrees, minutes and seconds to decimal degrees.
pub fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + (minutes / 60.0) + (seconds / 3600.0)
}

/// Applies the hemisphere reference: anything but `positive_ref` flips the sign.
pub fn apply_reference(value: f64, reference: &str, positive_ref: &str) -> f64 {
    if reference.trim() == positive_ref {
        value
    } else {
        -value
    }
}

fn read_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, positive_ref: &str) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let reference = read_ascii(exif, ref_tag)?;

    let degrees = match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => dms_to_degrees(
            parts[0].to_f64(),
            parts[1].to_f64(),
            parts[2].to_f64(),
        ),
        other => {
            tracing::warn!("Ignoring malformed {} value: {:?}", value_tag, other);
            return None;
        }
    };

    Some(apply_reference(degrees, &reference, positive_ref))
}

fn read_ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => values
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string()),
        _ => None,
    }
}
