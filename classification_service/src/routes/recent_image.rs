use crate::server::SharedState;
use axum::{extract::State, Json};
use cloud_store::records::TIMESTAMP_FIELD;
use serde::Serialize;
use service_core::ApiError;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct RecentImage {
    pub image_url: String,
}

#[instrument(skip(state))]
pub async fn recent_image(State(state): State<SharedState>) -> Result<Json<RecentImage>, ApiError> {
    state.metrics.record_request("/recent-image");

    match state.predictions.latest(TIMESTAMP_FIELD).await? {
        Some(latest) => Ok(Json(RecentImage {
            image_url: latest.record.image_url,
        })),
        None => Err(ApiError::NotFound("No predictions found".into())),
    }
}
