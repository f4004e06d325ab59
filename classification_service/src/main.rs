use classification_service::{config, start_app};
use service_core::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    init_tracing(&config.log_level);

    start_app(config).await
}
