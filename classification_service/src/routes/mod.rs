mod home;
mod predict;
mod predictions;
mod recent_image;
mod upload;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(home::home))
        .route("/predict", post(predict::predict))
        .route("/recent-image", get(recent_image::recent_image))
        .route("/upload", post(upload::upload_image))
        .route("/predictions", get(predictions::list_predictions))
}
