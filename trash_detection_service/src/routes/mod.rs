mod detections;
mod home;
mod upload;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(home::home))
        .route("/upload", post(upload::upload_image))
        .route("/trash-detections", get(detections::list_detections))
        .route("/trash-detections/{id}", get(detections::get_detection))
}
