use crate::{annotate::annotate_image, server::SharedState};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use cloud_store::records::{TrashDetectionRecord, TIMESTAMP_FIELD};
use photo_metadata::extract_metadata;
use serde::Serialize;
use service_core::{read_file_field, ApiError};
use std::{path::Path, sync::Arc, time::Instant};
use tracing::instrument;

const ROUTE: &str = "/upload";
const ANNOTATED_PREFIX: &str = "annotated";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_url: String,
    pub bounding_box_image_url: String,
    pub trash_count: u32,
    pub document_id: String,
}

/// Object path of the annotated copy, e.g. `annotated/DJI_0042.jpg`.
fn annotated_path(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("image");
    format!("{}/{}.jpg", ANNOTATED_PREFIX, stem)
}

#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    state.metrics.record_request(ROUTE);
    let file = read_file_field(multipart).await?;

    let start = Instant::now();
    let detections = state.model_service.detect(file.data.clone()).await?;
    state
        .metrics
        .record_inference_duration(start.elapsed().as_millis() as u64, ROUTE);
    state.metrics.record_detections(detections.len());
    tracing::info!("Detected {} objects in {}", detections.len(), file.file_name);

    let trash_count = u32::try_from(detections.len())
        .map_err(|_| ApiError::Internal("Too many detections".into()))?;

    let data = Arc::new(file.data);
    let annotated = {
        let data = data.clone();
        tokio::task::spawn_blocking(move || annotate_image(&data, &detections)).await??
    };
    let metadata = extract_metadata(&data);
    let data = Arc::try_unwrap(data).unwrap_or_else(|shared| shared.as_ref().clone());

    let image_url = state
        .objects
        .upload(&file.file_name, data, &file.content_type)
        .await?;
    let bounding_box_image_url = state
        .objects
        .upload(&annotated_path(&file.file_name), annotated, "image/jpeg")
        .await?;

    let record = TrashDetectionRecord {
        file_name: file.file_name,
        image_url,
        bounding_box_image_url,
        trash_count,
        latitude: metadata.latitude,
        longitude: metadata.longitude,
        date_created: metadata.date_created,
        timestamp: None,
    };
    let document_id = state
        .detections
        .add_with_timestamp(&record, TIMESTAMP_FIELD)
        .await?;

    Ok(Json(UploadResponse {
        image_url: record.image_url,
        bounding_box_image_url: record.bounding_box_image_url,
        trash_count,
        document_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_path() {
        assert_eq!(annotated_path("DJI_0042.JPG"), "annotated/DJI_0042.jpg");
        assert_eq!(annotated_path("beach.shore.png"), "annotated/beach.shore.jpg");
        assert_eq!(annotated_path("noext"), "annotated/noext.jpg");
    }
}
