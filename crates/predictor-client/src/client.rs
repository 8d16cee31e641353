//! HTTP client for the hosted classifier

use crate::{PriceCategory, Predictor, PredictorError};
use async_trait::async_trait;
use feature_validator::ValidatedRequest;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How predictions are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorMode {
    /// Signed InvokeEndpoint call to the hosted endpoint
    SageMaker,
    /// Unsigned POST to `endpoint_url`, for gateways that sign on our behalf
    Http,
    /// Local heuristic, for development without the endpoint
    Mock,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Hosted endpoint name
    pub endpoint_name: String,
    /// Hosting region
    pub region: String,
    /// Endpoint override. In `http` mode the full invocation URL (required);
    /// in `sagemaker` mode the base URL for signed calls.
    pub endpoint_url: Option<String>,
    /// Request timeout (ms)
    pub timeout_ms: u64,
    /// Prediction source
    pub mode: PredictorMode,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            endpoint_name: "Custom-sklearn-model-2024-11-19-07-30-02".to_string(),
            region: "ap-south-1".to_string(),
            endpoint_url: None,
            timeout_ms: 5000,
            mode: PredictorMode::SageMaker,
        }
    }
}

/// Classifier reached over plain HTTP. One request per prediction, no retries.
/// Requests are not signed.
pub struct HttpPredictor {
    client: reqwest::Client,
    config: PredictorConfig,
    url: String,
}

impl HttpPredictor {
    /// Create a client with the configured timeout. Needs `endpoint_url`.
    pub fn new(config: PredictorConfig) -> Result<Self, PredictorError> {
        let url = config.endpoint_url.clone().ok_or_else(|| {
            PredictorError::Setup("http mode requires predictor.endpoint_url".into())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PredictorError::Setup(e.to_string()))?;

        info!(
            "Creating HTTP predictor client: url={}, timeout={}ms",
            url, config.timeout_ms
        );

        Ok(Self {
            client,
            config,
            url,
        })
    }

    /// Invocation URL in use
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, e: reqwest::Error) -> PredictorError {
        if e.is_timeout() {
            PredictorError::Timeout(self.config.timeout_ms)
        } else {
            PredictorError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, request: &ValidatedRequest) -> Result<PriceCategory, PredictorError> {
        let start = Instant::now();
        // the endpoint takes a batch of rows
        let payload = [request];

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            warn!("Predictor returned HTTP {}", status.as_u16());
            return Err(PredictorError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let code = parse_response(&body)?;
        debug!(
            "Predictor answered code {} in {}ms",
            code,
            start.elapsed().as_millis()
        );
        PriceCategory::from_code(code)
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

/// Extract the category code from a response body.
///
/// The endpoint answers with a JSON array of predictions, one per row; a
/// bare number is accepted as well. Integral floats (`2.0`) are tolerated.
pub(crate) fn parse_response(body: &str) -> Result<i64, PredictorError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PredictorError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let first = match &value {
        serde_json::Value::Array(items) => items
            .first()
            .ok_or_else(|| PredictorError::MalformedResponse("empty prediction list".into()))?,
        other => other,
    };

    if let Some(code) = first.as_i64() {
        return Ok(code);
    }
    match first.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(PredictorError::MalformedResponse(format!(
            "expected integer category, got {}",
            truncate(&first.to_string(), 64)
        ))),
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
