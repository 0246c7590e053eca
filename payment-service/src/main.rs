use payment_service::{config::Config, services::init_metrics, Application};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(
        &config.service_name,
        &config.telemetry.log_level,
        config.telemetry.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    tracing::info!(service = %config.service_name, "Starting payment service");

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
