use crate::{
    config::Config,
    ort_service::OrtModelService,
    server::{create_router, SharedState},
};
use cloud_store::Stores;
use service_core::{HttpServer, Metrics};
use std::sync::Arc;

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let model_service = match OrtModelService::new(&config.model) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("Failed to initialize model service: {:?}", e);
            return Err(e.into());
        }
    };

    let metrics = Arc::new(Metrics::new("classification")?);
    let stores = Stores::from_config(&config.storage)?;
    let state = SharedState::new(model_service, stores, metrics);

    let router = create_router(state, &config.upload);
    let server = HttpServer::new(router, &config.server).await?;
    server.run().await
}
