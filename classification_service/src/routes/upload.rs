use crate::server::SharedState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use cloud_store::records::ImageRecord;
use photo_metadata::extract_metadata;
use serde::Serialize;
use service_core::{detect_format, read_file_field, ApiError};
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_created: String,
}

#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    state.metrics.record_request("/upload");
    let file = read_file_field(multipart).await?;
    detect_format(&file.data)?;

    let metadata = extract_metadata(&file.data);
    tracing::debug!("Metadata for {}: {:?}", file.file_name, metadata);

    let image_url = state
        .objects
        .upload(&file.file_name, file.data, &file.content_type)
        .await?;

    let record = ImageRecord {
        file_name: file.file_name,
        image_url,
        latitude: metadata.latitude,
        longitude: metadata.longitude,
        date_created: metadata.date_created,
    };
    let document_id = state.images.add(&record).await?;

    Ok(Json(UploadResponse {
        document_id,
        image_url: record.image_url,
        latitude: record.latitude,
        longitude: record.longitude,
        date_created: record.date_created,
    }))
}
