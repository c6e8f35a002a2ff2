use gescom_service::config::GescomConfig;
use gescom_service::services::init_metrics;
use gescom_service::Application;
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Fail fast on an invalid environment before anything else starts.
    let config = GescomConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level, &config.otlp_endpoint);
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting gestion commerciale service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}
