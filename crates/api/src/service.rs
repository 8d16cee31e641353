//! Prediction flow: validate, consult the cache, call the predictor, record

use chrono::Utc;
use feature_validator::{validate_and_build, RawFields, ValidationError};
use predictor_client::{PriceCategory, Predictor, PredictorError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use storage::{feature_key, PredictionLogRecord, Repository, StorageError};
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::monitoring::MetricsCollector;

/// Message shown for any service-side failure
pub const TRY_AGAIN_MESSAGE: &str =
    "The prediction service is temporarily unavailable. Please try again later.";

/// The three error kinds a prediction can end in
#[derive(Debug, Error)]
pub enum PredictError {
    /// Bad input; the predictor was never called
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Predictor unreachable, timed out, or answered nonsense
    #[error("Predictor unavailable: {0}")]
    PredictorUnavailable(#[from] PredictorError),
    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<StorageError> for PredictError {
    fn from(e: StorageError) -> Self {
        PredictError::Unexpected(e.to_string())
    }
}

impl PredictError {
    /// Stable kind name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation",
            PredictError::PredictorUnavailable(_) => "predictor_unavailable",
            PredictError::Unexpected(_) => "unexpected",
        }
    }
}

/// Result of a successful prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub request_id: Uuid,
    pub category: PriceCategory,
    pub from_cache: bool,
    pub latency_ms: f64,
}

/// Orchestrates one prediction per call. Holds no per-request state.
pub struct PredictionService {
    predictor: Arc<dyn Predictor>,
    repository: Arc<Repository>,
    metrics: Arc<MetricsCollector>,
    cache_enabled: bool,
}

impl PredictionService {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        repository: Arc<Repository>,
        metrics: Arc<MetricsCollector>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            predictor,
            repository,
            metrics,
            cache_enabled,
        }
    }

    /// Predictor description for health output
    pub fn predictor_description(&self) -> String {
        self.predictor.describe()
    }

    /// Whether identical vectors reuse cached answers
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Validate raw fields and classify them
    pub async fn predict<R>(&self, raw: &R) -> Result<PredictionOutcome, PredictError>
    where
        R: RawFields + ?Sized,
    {
        let request_id = Uuid::new_v4();
        let span = info_span!("prediction", %request_id);
        let start = Instant::now();

        let mut feature_key_used = None;
        let result = self
            .run(raw, request_id, &mut feature_key_used)
            .instrument(span)
            .await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.metrics.record_request(latency_ms, result.is_ok());

        let record = PredictionLogRecord {
            id: 0,
            request_id,
            feature_key: feature_key_used,
            category_code: result.as_ref().ok().map(|(c, _)| c.code()),
            response_time_ms: latency_ms,
            success: result.is_ok(),
            from_cache: matches!(result, Ok((_, true))),
            error_message: result.as_ref().err().map(ToString::to_string),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.repository.log_prediction(record) {
            warn!("Failed to log prediction: {}", e);
        }

        match result {
            Ok((category, from_cache)) => {
                info!(
                    %request_id,
                    "Prediction {} ({}ms, cached={})",
                    category.label(),
                    latency_ms.round(),
                    from_cache
                );
                Ok(PredictionOutcome {
                    request_id,
                    category,
                    from_cache,
                    latency_ms,
                })
            }
            Err(e) => {
                match &e {
                    PredictError::Validation(v) => {
                        info!(%request_id, "Rejected input: {}", v);
                    }
                    PredictError::PredictorUnavailable(p) => {
                        error!(%request_id, "Predictor failure: {}", p);
                    }
                    PredictError::Unexpected(msg) => {
                        error!(%request_id, "Unexpected failure: {}", msg);
                    }
                }
                self.metrics.record_error(e.kind(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn run<R>(
        &self,
        raw: &R,
        request_id: Uuid,
        feature_key_used: &mut Option<String>,
    ) -> Result<(PriceCategory, bool), PredictError>
    where
        R: RawFields + ?Sized,
    {
        let request = validate_and_build(raw)?;

        if !self.cache_enabled {
            let category = self.predictor.predict(&request).await?;
            return Ok((category, false));
        }

        let key = feature_key(&request)?;
        *feature_key_used = Some(key.clone());

        if let Some(cached) = self.repository.get_cached(&key)? {
            // a code outside 0..=3 can only come from a corrupted entry
            let category = PriceCategory::from_code(i64::from(cached.category_code))
                .map_err(|e| PredictError::Unexpected(e.to_string()))?;
            return Ok((category, true));
        }

        let category = self.predictor.predict(&request).await?;
        if let Err(e) = self
            .repository
            .cache_prediction(&key, category.code(), category.label())
        {
            warn!(%request_id, "Failed to cache prediction: {}", e);
        }
        Ok((category, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_validator::FEATURE_SPECS;
    use predictor_client::MockPredictor;
    use std::collections::HashMap;

    fn valid_form() -> HashMap<String, String> {
        let mut form: HashMap<String, String> = FEATURE_SPECS
            .iter()
            .map(|spec| (spec.name.to_string(), "1".to_string()))
            .collect();
        form.insert("ram".into(), "3500".into());
        form
    }

    fn service(
        predictor: Arc<MockPredictor>,
        cache: bool,
    ) -> (PredictionService, Arc<Repository>, Arc<MetricsCollector>) {
        let repository = Arc::new(Repository::new());
        let metrics = Arc::new(MetricsCollector::new(100));
        let service =
            PredictionService::new(predictor, repository.clone(), metrics.clone(), cache);
        (service, repository, metrics)
    }

    #[tokio::test]
    async fn test_successful_prediction() {
        let predictor = Arc::new(MockPredictor::fixed(3));
        let (service, repository, metrics) = service(predictor.clone(), false);

        let outcome = service.predict(&valid_form()).await.unwrap();
        assert_eq!(outcome.category, PriceCategory::Premium);
        assert!(!outcome.from_cache);
        assert_eq!(predictor.calls(), 1);
        assert_eq!(metrics.snapshot().successful_requests, 1);

        let logs = repository.recent_logs(1).unwrap();
        assert!(logs[0].success);
        assert_eq!(logs[0].category_code, Some(3));
        assert_eq!(repository.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_validation_never_reaches_predictor() {
        let predictor = Arc::new(MockPredictor::fixed(0));
        let (service, _, metrics) = service(predictor.clone(), false);

        let mut form = valid_form();
        form.remove("ram");
        form.insert("wifi".into(), "5".into());

        let err = service.predict(&form).await.unwrap_err();
        match err {
            PredictError::Validation(v) => assert_eq!(v.fields(), ["ram", "wifi"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(predictor.calls(), 0);
        assert_eq!(metrics.snapshot().failed_requests, 1);
        assert_eq!(metrics.recent_errors(1)[0].kind, "validation");
    }

    #[tokio::test]
    async fn test_unknown_code_is_unavailable() {
        let (service, _, _) = service(Arc::new(MockPredictor::fixed(4)), false);
        let err = service.predict(&valid_form()).await.unwrap_err();
        assert!(matches!(
            err,
            PredictError::PredictorUnavailable(PredictorError::UnknownCategory(4))
        ));
        assert_eq!(err.kind(), "predictor_unavailable");
    }

    #[tokio::test]
    async fn test_outage_not_retried() {
        let predictor = Arc::new(MockPredictor::unavailable());
        let (service, repository, _) = service(predictor.clone(), true);

        assert!(service.predict(&valid_form()).await.is_err());
        assert_eq!(predictor.calls(), 1);
        assert_eq!(repository.cache_len(), 0);
        let logs = repository.recent_logs(1).unwrap();
        assert!(!logs[0].success);
        assert!(logs[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_cache_reuses_answer() {
        let predictor = Arc::new(MockPredictor::heuristic());
        let (service, repository, _) = service(predictor.clone(), true);

        let first = service.predict(&valid_form()).await.unwrap();
        let second = service.predict(&valid_form()).await.unwrap();
        assert_eq!(first.category, second.category);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(predictor.calls(), 1);
        assert_eq!(repository.cache_stats().unwrap().cache_hits, 1);
    }
}
