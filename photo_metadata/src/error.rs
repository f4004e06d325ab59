use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to parse EXIF data: {0}")]
    Exif(#[from] exif::Error),
    #[error("Not a JPEG file")]
    NotJpeg,
    #[error("Malformed JPEG segment at offset {0}")]
    MalformedSegment(usize),
    #[error("EXIF block of {0} bytes does not fit in an APP1 segment")]
    ExifTooLarge(usize),
    #[error("Latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
