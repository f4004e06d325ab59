use crate::server::SharedState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use cloud_store::records::{PredictionRecord, TIMESTAMP_FIELD};
use serde::Serialize;
use service_core::{read_file_field, ApiError};
use std::time::Instant;
use tracing::instrument;

const ROUTE: &str = "/predict";

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_class: String,
    pub document_id: String,
    pub image_url: String,
}

#[instrument(skip(state, multipart))]
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    state.metrics.record_request(ROUTE);
    let file = read_file_field(multipart).await?;

    // Classify before uploading so undecodable files leave nothing behind.
    let start = Instant::now();
    let classification = state.model_service.classify(file.data.clone()).await?;
    state
        .metrics
        .record_inference_duration(start.elapsed().as_millis() as u64, ROUTE);
    tracing::info!(
        "Classified {} as {} ({:.3})",
        file.file_name,
        classification.label,
        classification.confidence
    );

    let image_url = state
        .objects
        .upload(&file.file_name, file.data, &file.content_type)
        .await?;

    let record = PredictionRecord {
        file_name: file.file_name,
        predicted_class: classification.label,
        image_url,
        timestamp: None,
    };
    let document_id = state
        .predictions
        .add_with_timestamp(&record, TIMESTAMP_FIELD)
        .await?;

    Ok(Json(PredictResponse {
        predicted_class: record.predicted_class,
        document_id,
        image_url: record.image_url,
    }))
}
