use crate::server::SharedState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use cloud_store::records::TrashDetectionRecord;
use service_core::{ApiError, ListParams, ListedDocument};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn list_detections(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ListedDocument<TrashDetectionRecord>>>, ApiError> {
    state.metrics.record_request("/trash-detections");

    let detections = state.detections.list(params.limit).await?;
    Ok(Json(detections.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_detection(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ListedDocument<TrashDetectionRecord>>, ApiError> {
    state.metrics.record_request("/trash-detections/{id}");

    match state.detections.get(&id).await? {
        Some(stored) => Ok(Json(stored.into())),
        None => Err(ApiError::NotFound(format!("No trash detection with id {}", id))),
    }
}
