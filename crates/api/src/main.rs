//! Smartphone Price Predictor - Main Entry Point

use api::{config::AppConfig, config::CONFIG_PATH_ENV, init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var(CONFIG_PATH_ENV).ok();
    let config = AppConfig::load(config_path.as_deref())?;

    init_logging(&config.logging).map_err(|e| e.to_string())?;

    info!("=== Smartphone Price Predictor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Predictor: endpoint={}, region={}, mode={:?}",
        config.predictor.endpoint_name, config.predictor.region, config.predictor.mode
    );

    run_server(config).await?;

    Ok(())
}
