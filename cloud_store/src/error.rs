use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Record must serialize to a JSON object")]
    NotAnObject,
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    #[error("Failed to sign token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
