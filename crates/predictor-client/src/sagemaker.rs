//! Signed InvokeEndpoint calls to the hosted SageMaker endpoint

use crate::client::{parse_response, truncate};
use crate::{PredictorConfig, PriceCategory, Predictor, PredictorError};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sagemakerruntime::config::http::HttpResponse;
use aws_sdk_sagemakerruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_sagemakerruntime::operation::invoke_endpoint::InvokeEndpointError;
use aws_sdk_sagemakerruntime::primitives::Blob;
use aws_sdk_sagemakerruntime::Client;
use feature_validator::ValidatedRequest;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Classifier hosted on SageMaker. Credentials come from the default AWS
/// provider chain; one attempt per prediction.
pub struct SageMakerPredictor {
    client: Client,
    config: PredictorConfig,
}

impl SageMakerPredictor {
    /// Load AWS configuration for the configured region and build a client
    pub async fn new(config: PredictorConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(operation_timeout(config.timeout_ms));
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;

        info!(
            "Creating SageMaker predictor: endpoint={}, region={}, timeout={}ms",
            config.endpoint_name, config.region, config.timeout_ms
        );
        Self::with_client(Client::new(&sdk_config), config)
    }

    /// Wrap an existing client. Retry and timeout settings are the client's.
    pub fn with_client(client: Client, config: PredictorConfig) -> Self {
        Self { client, config }
    }

    fn map_sdk_error(&self, e: SdkError<InvokeEndpointError, HttpResponse>) -> PredictorError {
        let detail = DisplayErrorContext(&e).to_string();
        match &e {
            SdkError::TimeoutError(_) => PredictorError::Timeout(self.config.timeout_ms),
            SdkError::DispatchFailure(failure) if failure.is_timeout() => {
                PredictorError::Timeout(self.config.timeout_ms)
            }
            SdkError::ServiceError(service) => PredictorError::Status {
                status: service.raw().status().as_u16(),
                body: truncate(&service.err().to_string(), 200),
            },
            SdkError::ResponseError(_) => PredictorError::MalformedResponse(detail),
            _ => PredictorError::Unreachable(detail),
        }
    }
}

/// Whole-operation timeout, covering credential lookup, signing and the call
pub(crate) fn operation_timeout(timeout_ms: u64) -> TimeoutConfig {
    TimeoutConfig::builder()
        .operation_timeout(Duration::from_millis(timeout_ms))
        .build()
}

#[async_trait]
impl Predictor for SageMakerPredictor {
    async fn predict(&self, request: &ValidatedRequest) -> Result<PriceCategory, PredictorError> {
        let start = Instant::now();
        let payload = serde_json::to_vec(&[request])
            .map_err(|e| PredictorError::Setup(format!("payload encoding failed: {e}")))?;

        let output = self
            .client
            .invoke_endpoint()
            .endpoint_name(&self.config.endpoint_name)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                let error = self.map_sdk_error(e);
                warn!("InvokeEndpoint failed: {}", error);
                error
            })?;

        let body = output
            .body()
            .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned())
            .unwrap_or_default();
        let code = parse_response(&body)?;
        debug!(
            "SageMaker answered code {} in {}ms",
            code,
            start.elapsed().as_millis()
        );
        PriceCategory::from_code(code)
    }

    fn describe(&self) -> String {
        format!("sagemaker:{}", self.config.endpoint_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sagemakerruntime::config::Credentials;
    use axum::{
        extract::Path,
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use feature_validator::{validate_and_build, FEATURE_SPECS};
    use std::collections::HashMap;

    const ENDPOINT: &str = "phone-model";

    fn request() -> ValidatedRequest {
        let form: HashMap<String, String> = FEATURE_SPECS
            .iter()
            .map(|spec| (spec.name.to_string(), "1".to_string()))
            .collect();
        validate_and_build(&form).unwrap()
    }

    async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn predictor_for(base_url: String, timeout_ms: u64) -> SageMakerPredictor {
        let conf = aws_sdk_sagemakerruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("ap-south-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url(base_url)
            .retry_config(RetryConfig::disabled())
            .timeout_config(operation_timeout(timeout_ms))
            .build();

        SageMakerPredictor::with_client(
            Client::from_conf(conf),
            PredictorConfig {
                endpoint_name: ENDPOINT.to_string(),
                timeout_ms,
                ..Default::default()
            },
        )
    }

    async fn invocations(
        Path(name): Path<String>,
        headers: HeaderMap,
        Json(rows): Json<Vec<Vec<f64>>>,
    ) -> axum::response::Response {
        let signed = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("AWS4-HMAC-SHA256"));
        if !signed {
            return (StatusCode::FORBIDDEN, "missing signature").into_response();
        }
        if name != ENDPOINT || rows.len() != 1 || rows[0].len() != 20 {
            return (StatusCode::BAD_REQUEST, "bad invocation").into_response();
        }
        Json(vec![2]).into_response()
    }

    #[tokio::test]
    async fn test_signed_invocation() {
        let router = Router::new().route("/endpoints/:name/invocations", post(invocations));
        let url = spawn_endpoint(router).await;

        let predictor = predictor_for(url, 2000);
        let category = predictor.predict(&request()).await.unwrap();
        assert_eq!(category, PriceCategory::UpperMidRange);
        assert_eq!(predictor.describe(), "sagemaker:phone-model");
    }

    #[tokio::test]
    async fn test_service_error_status() {
        let router = Router::new().route(
            "/endpoints/:name/invocations",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "message": "model crashed" })),
                )
            }),
        );
        let url = spawn_endpoint(router).await;

        let result = predictor_for(url, 2000).predict(&request()).await;
        assert!(matches!(
            result,
            Err(PredictorError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let router = Router::new().route(
            "/endpoints/:name/invocations",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(2000)).await;
                Json(vec![0])
            }),
        );
        let url = spawn_endpoint(router).await;

        let result = predictor_for(url, 100).predict(&request()).await;
        assert!(matches!(result, Err(PredictorError::Timeout(100))));
    }
}
