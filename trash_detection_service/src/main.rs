use service_core::telemetry::init_tracing;
use trash_detection_service::{config, start_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    init_tracing(&config.log_level);

    start_app(config).await
}
