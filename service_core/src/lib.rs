mod error;
mod imaging;
mod listing;
mod routes;
mod server;
mod session_pool;
mod upload;

pub mod config;
pub mod telemetry;

pub use error::{ApiError, InferenceError};
pub use imaging::{decode_image, detect_format};
pub use listing::{ListParams, ListedDocument};
pub use routes::{healthcheck, metrics_handler, ops_routes};
pub use server::{with_common_layers, HttpServer};
pub use session_pool::SessionPool;
pub use telemetry::Metrics;
pub use upload::{read_file_field, UploadedFile};
