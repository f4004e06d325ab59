use crate::{error::MetadataError, jpeg};
use exif::{experimental::Writer, Field, In, Rational, Reader, Tag, Value};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

const SECONDS_SCALE: u32 = 10_000;

/// A coordinate in EXIF rational form: degrees/1, minutes/1, seconds/10000.
pub type DmsRational = [(u32, u32); 3];

pub fn degrees_to_dms(value: f64) -> DmsRational {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = (((value - degrees) * 60.0 - minutes) * 60.0 * SECONDS_SCALE as f64).round();

    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        (seconds as u32, SECONDS_SCALE),
    ]
}

pub fn latitude_ref(latitude: f64) -> &'static str {
    if latitude >= 0.0 {
        "N"
    } else {
        "S"
    }
}

pub fn longitude_ref(longitude: f64) -> &'static str {
    if longitude >= 0.0 {
        "E"
    } else {
        "W"
    }
}

/// Sets the GPS position of a JPEG image, preserving the other primary-image
/// EXIF fields. The thumbnail IFD is not carried over.
pub fn set_gps_location(
    jpeg_data: &[u8],
    latitude: f64,
    longitude: f64,
) -> Result<Vec<u8>, MetadataError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(MetadataError::InvalidLatitude(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(MetadataError::InvalidLongitude(longitude));
    }
    if !jpeg::is_jpeg(jpeg_data) {
        return Err(MetadataError::NotJpeg);
    }

    let (mut fields, little_endian) =
        match Reader::new().read_from_container(&mut Cursor::new(jpeg_data)) {
            Ok(exif) => {
                let kept = exif
                    .fields()
                    .filter(|field| field.ifd_num == In::PRIMARY)
                    .filter(|field| !is_gps_position_tag(field.tag))
                    .filter(|field| !matches!(field.value, Value::Unknown(..)))
                    .cloned()
                    .collect::<Vec<_>>();
                (kept, exif.little_endian())
            }
            Err(exif::Error::NotFound(_)) => {
                tracing::debug!("No existing EXIF block, creating one");
                (Vec::new(), false)
            }
            Err(e) => return Err(e.into()),
        };

    fields.extend(gps_fields(latitude, longitude));

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, little_endian)?;

    jpeg::replace_exif_segment(jpeg_data, &tiff.into_inner())
}

/// Reads `image_path`, tags it and writes the result to `output_path`
/// (or `modified_<name>` beside the input). Returns the written path.
pub fn tag_file(
    image_path: &Path,
    latitude: f64,
    longitude: f64,
    output_path: Option<&Path>,
) -> Result<PathBuf, MetadataError> {
    let jpeg_data = std::fs::read(image_path)?;
    let tagged = set_gps_location(&jpeg_data, latitude, longitude)?;

    let destination = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| modified_path(image_path));
    std::fs::write(&destination, tagged)?;

    tracing::info!(
        "Wrote {} with latitude={} longitude={}",
        destination.display(),
        latitude,
        longitude
    );
    Ok(destination)
}

pub fn modified_path(image_path: &Path) -> PathBuf {
    let file_name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    image_path.with_file_name(format!("modified_{}", file_name))
}

fn is_gps_position_tag(tag: Tag) -> bool {
    tag == Tag::GPSLatitude
        || tag == Tag::GPSLatitudeRef
        || tag == Tag::GPSLongitude
        || tag == Tag::GPSLongitudeRef
}

fn gps_fields(latitude: f64, longitude: f64) -> [Field; 4] {
    [
        ascii_field(Tag::GPSLatitudeRef, latitude_ref(latitude)),
        rational_field(Tag::GPSLatitude, degrees_to_dms(latitude)),
        ascii_field(Tag::GPSLongitudeRef, longitude_ref(longitude)),
        rational_field(Tag::GPSLongitude, degrees_to_dms(longitude)),
    ]
}

fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rational_field(tag: Tag, dms: DmsRational) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            dms.iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}
