use crate::{model_service::ModelService, routes::api_routes};
use axum::{extract::FromRef, Router};
use cloud_store::{
    records::{TrashDetectionRecord, TRASH_DETECTION},
    Collection, ObjectStore, Stores,
};
use service_core::{config::UploadConfig, ops_routes, with_common_layers, Metrics};
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedState {
    pub model_service: Arc<dyn ModelService>,
    pub detections: Collection<TrashDetectionRecord>,
    pub objects: Arc<dyn ObjectStore>,
    pub metrics: Arc<Metrics>,
}

impl SharedState {
    pub fn new(model_service: Arc<dyn ModelService>, stores: Stores, metrics: Arc<Metrics>) -> Self {
        Self {
            model_service,
            detections: Collection::new(stores.documents, TRASH_DETECTION),
            objects: stores.objects,
            metrics,
        }
    }
}

impl FromRef<SharedState> for Arc<Metrics> {
    fn from_ref(state: &SharedState) -> Self {
        state.metrics.clone()
    }
}

pub fn create_router(state: SharedState, upload: &UploadConfig) -> Router {
    let router = Router::new()
        .merge(api_routes())
        .merge(ops_routes())
        .with_state(state);

    with_common_layers(router, upload)
}
