//! Smartphone Price Predictor Server
//!
//! HTML form and JSON API in front of the hosted price classifier.

use axum::{
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use predictor_client::{build_predictor, Predictor, PredictorError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use storage::{Repository, RepositoryLimits};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn, Level};

pub mod config;
pub mod monitoring;
pub mod render;
pub mod routes;
pub mod service;

use crate::config::{AppConfig, LoggingConfig};
use crate::monitoring::MetricsCollector;
use crate::service::PredictionService;

const FAVICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 32 32"><rect x="8" y="2" width="16" height="28" rx="3" fill="#2d6cdf"/><rect x="10" y="5" width="12" height="20" fill="#fff"/></svg>"##;

/// Application state shared across handlers
pub struct AppState {
    /// Prediction flow
    pub service: PredictionService,
    /// Cache and prediction log
    pub repository: Arc<Repository>,
    /// Request metrics
    pub metrics: Arc<MetricsCollector>,
    /// Startup configuration
    pub config: AppConfig,
    /// Set when the Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state around an existing predictor
    pub fn new(
        config: AppConfig,
        predictor: Arc<dyn Predictor>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let repository = Arc::new(Repository::with_limits(RepositoryLimits {
            max_cache_entries: config.cache.max_entries,
            max_log_records: config.cache.max_log_records,
        }));
        let metrics = Arc::new(MetricsCollector::new(config.monitoring.max_history));
        let service = PredictionService::new(
            predictor,
            repository.clone(),
            metrics.clone(),
            config.cache.enabled,
        );

        Self {
            service,
            repository,
            metrics,
            config,
            prometheus,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Build the configured predictor and assemble state
    pub async fn from_config(
        config: AppConfig,
        prometheus: Option<PrometheusHandle>,
    ) -> Result<Self, PredictorError> {
        let predictor = build_predictor(&config.predictor).await?;
        Ok(Self::new(config, predictor, prometheus))
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/", get(routes::form::show_form).post(routes::form::submit_form))
        .route("/favicon.ico", get(favicon))
        .route("/metrics", get(routes::admin::prometheus))
        .route("/api/v1/predict", post(routes::predictions::predict))
        .route("/api/v1/features", get(routes::predictions::list_features))
        .route("/api/v1/health", get(routes::admin::health))
        .route("/api/v1/cache/stats", get(routes::admin::cache_stats))
        .route("/api/v1/cache/cleanup", post(routes::admin::cache_cleanup))
        .route("/api/v1/metrics", get(routes::admin::metrics))
        .route("/api/v1/errors", get(routes::admin::errors))
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn favicon() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], FAVICON)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = Level::from_str(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// Install the Prometheus recorder if enabled. Failure only disables export.
pub fn install_prometheus(config: &AppConfig) -> Option<PrometheusHandle> {
    if !config.monitoring.prometheus {
        return None;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus export disabled: {}", e);
            None
        }
    }
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.server.bind_addr();
    let prometheus = install_prometheus(&config);
    let state = Arc::new(AppState::from_config(config, prometheus).await?);
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
