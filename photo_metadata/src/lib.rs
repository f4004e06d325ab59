mod error;
mod jpeg;

pub mod geotag;
pub mod gps_writer;

pub use error::MetadataError;
pub use geotag::{extract_metadata, PhotoMetadata, UNKNOWN_DATE};
pub use gps_writer::{set_gps_location, tag_file};
