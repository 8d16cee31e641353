//! Health, cache and monitoring routes

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::CacheStats;
use tracing::error;

use crate::monitoring::{ErrorEntry, MetricsSnapshot, RequestSample};
use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub predictor: PredictorInfo,
    pub cache: Option<CacheStats>,
    pub metrics: MetricsSnapshot,
}

/// Predictor configuration summary
#[derive(Debug, Serialize)]
pub struct PredictorInfo {
    pub backend: String,
    pub endpoint: String,
    pub region: String,
    pub timeout_ms: u64,
    pub cache_enabled: bool,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let cache = match state.repository.cache_stats() {
        Ok(stats) => Some(stats),
        Err(e) => {
            error!("Cache stats unavailable: {}", e);
            None
        }
    };
    let predictor = &state.config.predictor;

    Json(HealthResponse {
        status: String::from(if cache.is_some() { "healthy" } else { "degraded" }),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        predictor: PredictorInfo {
            backend: state.service.predictor_description(),
            endpoint: predictor.endpoint_name.clone(),
            region: predictor.region.clone(),
            timeout_ms: predictor.timeout_ms,
            cache_enabled: state.service.cache_enabled(),
        },
        cache,
        metrics: state.metrics.snapshot(),
    })
}

fn storage_failure(e: storage::StorageError) -> (StatusCode, String) {
    error!("Storage failure: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable".to_string())
}

/// Cache statistics
pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CacheStats>, (StatusCode, String)> {
    state
        .repository
        .cache_stats()
        .map(Json)
        .map_err(storage_failure)
}

/// Query parameters for cache cleanup
#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    /// Keep entries younger than this many days
    pub days: Option<u32>,
}

/// Cleanup result
#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub days: u32,
    pub stats: CacheStats,
}

/// Drop cached predictions older than `days`
pub async fn cache_cleanup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, (StatusCode, String)> {
    let days = params.days.unwrap_or(state.config.cache.retention_days);
    let removed = state
        .repository
        .cleanup_older_than(days)
        .map_err(storage_failure)?;
    let stats = state.repository.cache_stats().map_err(storage_failure)?;

    Ok(Json(CleanupResponse {
        removed,
        days,
        stats,
    }))
}

/// Query parameters for metrics endpoint
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_hours() -> u32 {
    24
}

/// Current metrics plus history
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub current: MetricsSnapshot,
    pub history: Vec<RequestSample>,
    pub hours: u32,
}

/// Application metrics
pub async fn metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricsQuery>,
) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        current: state.metrics.snapshot(),
        history: state.metrics.history(params.hours),
        hours: params.hours,
    })
}

/// Query parameters for errors endpoint
#[derive(Debug, Deserialize)]
pub struct ErrorsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Recent errors
#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub total_errors: u64,
    pub recent_errors: Vec<ErrorEntry>,
}

/// Recent errors, oldest first
pub async fn errors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ErrorsQuery>,
) -> Json<ErrorsResponse> {
    let limit = params.limit.min(1000);
    Json(ErrorsResponse {
        total_errors: state.metrics.snapshot().total_errors,
        recent_errors: state.metrics.recent_errors(limit),
    })
}

/// Prometheus exposition
pub async fn prometheus(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "prometheus export disabled").into_response(),
    }
}
