use crate::{error::ApiError, telemetry::Metrics};
use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
}

pub async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        status: "Available".into(),
    })
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<String, ApiError> {
    let metric_families = metrics.registry.gather();

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    String::from_utf8(buffer).map_err(|e| ApiError::Internal(e.to_string()))
}

/// `/health` and `/metrics`, shared by every service router.
pub fn ops_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<Metrics>: FromRef<S>,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/metrics", get(metrics_handler))
}
