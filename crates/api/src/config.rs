//! Application configuration
//!
//! Layered: built-in defaults, optional file, `PRICE_PREDICTOR__*`
//! environment variables, then the legacy `AWS_REGION`,
//! `SAGEMAKER_ENDPOINT` and `LOG_LEVEL` variables.

use predictor_client::{PredictorConfig, PredictorMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a config file
pub const CONFIG_PATH_ENV: &str = "PRICE_PREDICTOR_CONFIG";

/// Default config file (extension resolved by the `config` crate)
const DEFAULT_CONFIG_FILE: &str = "config/price-predictor";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: "static".to_string(),
        }
    }
}

impl ServerConfig {
    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Prediction cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Reuse answers for identical feature vectors
    pub enabled: bool,
    pub max_entries: usize,
    pub max_log_records: usize,
    /// Default age for cache cleanup
    pub retention_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10_000,
            max_log_records: 10_000,
            retention_days: 30,
        }
    }
}

/// Monitoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Samples and errors kept in memory
    pub max_history: usize,
    /// Install the Prometheus recorder and serve `/metrics`
    pub prometheus: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            max_history: 1000,
            prometheus: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Process-wide configuration, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub predictor: PredictorConfig,
    pub cache: CacheConfig,
    pub monitoring: MonitoringConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from all sources. `path` overrides the default
    /// file location; a missing default file is not an error.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => config::File::from(Path::new(p)).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("PRICE_PREDICTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("predictor.region", std::env::var("AWS_REGION").ok())?
            .set_override_option(
                "predictor.endpoint_name",
                std::env::var("SAGEMAKER_ENDPOINT").ok(),
            )?
            .set_override_option("logging.level", std::env::var("LOG_LEVEL").ok())?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.predictor.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "predictor.timeout_ms must be greater than 0".into(),
            ));
        }
        match self.predictor.mode {
            PredictorMode::SageMaker
                if self.predictor.endpoint_name.is_empty() || self.predictor.region.is_empty() =>
            {
                return Err(ConfigError::Invalid(
                    "predictor.endpoint_name and predictor.region are required in sagemaker mode"
                        .into(),
                ));
            }
            PredictorMode::Http if self.predictor.endpoint_url.is_none() => {
                return Err(ConfigError::Invalid(
                    "predictor.endpoint_url is required in http mode".into(),
                ));
            }
            _ => {}
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level {:?}",
                self.logging.level
            )));
        }
        Ok(())
    }
}
