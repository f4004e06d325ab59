use crate::server::SharedState;
use axum::{
    extract::{Query, State},
    Json,
};
use cloud_store::records::PredictionRecord;
use service_core::{ApiError, ListParams, ListedDocument};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn list_predictions(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ListedDocument<PredictionRecord>>>, ApiError> {
    state.metrics.record_request("/predictions");

    let predictions = state.predictions.list(params.limit).await?;
    Ok(Json(predictions.into_iter().map(Into::into).collect()))
}
