use crate::error::ApiError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
};

const FILE_FIELD: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Pulls the `file` part out of a multipart body. A body that is not
/// multipart at all is treated like one without the part.
pub async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Multipart rejection: {}", e);
        ApiError::BadRequest("No file uploaded".into())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error("Invalid multipart body", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(base_name).unwrap_or_default();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| body_error("Failed to read upload", e))?;

        if file_name.is_empty() {
            return Err(ApiError::BadRequest("No file selected".into()));
        }
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }

        tracing::debug!("Received {} ({} bytes, {})", file_name, data.len(), content_type);
        return Ok(UploadedFile {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file uploaded".into()))
}

/// Drops any client-side directory components from an uploaded file name.
fn body_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge(format!("Upload exceeds the size limit: {}", err));
    }
    ApiError::BadRequest(format!("{}: {}", context, err))
}

fn base_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
