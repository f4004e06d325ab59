mod annotate;
mod ort_service;
mod routes;

pub mod app;
pub mod config;
pub mod model_service;
pub mod server;

pub use app::start_app;
