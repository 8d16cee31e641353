//! Remote Price Classifier Client
//!
//! Sends validated feature vectors to the hosted classifier and maps the
//! returned code to a price category.

mod category;
mod client;
mod mock;
mod sagemaker;

pub use category::{PriceCategory, PLACEHOLDER_IMAGE};
pub use client::{HttpPredictor, PredictorConfig, PredictorMode};
pub use mock::MockPredictor;
pub use sagemaker::SageMakerPredictor;

use async_trait::async_trait;
use feature_validator::ValidatedRequest;
use std::sync::Arc;
use thiserror::Error;

/// Errors from the remote predictor. All variants are "service unavailable"
/// from the user's point of view.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Predictor request timed out after {0}ms")]
    Timeout(u64),
    #[error("Predictor unreachable: {0}")]
    Unreachable(String),
    #[error("Predictor returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed predictor response: {0}")]
    MalformedResponse(String),
    #[error("Unknown price category code {0}")]
    UnknownCategory(i64),
    #[error("Predictor client setup failed: {0}")]
    Setup(String),
}

/// A price classifier. Implementations must not retry on their own.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Classify one feature vector
    async fn predict(&self, request: &ValidatedRequest) -> Result<PriceCategory, PredictorError>;

    /// Short description for health output
    fn describe(&self) -> String;
}

/// Build the predictor selected by configuration
pub async fn build_predictor(
    config: &PredictorConfig,
) -> Result<Arc<dyn Predictor>, PredictorError> {
    let predictor: Arc<dyn Predictor> = match config.mode {
        PredictorMode::SageMaker => Arc::new(SageMakerPredictor::new(config.clone()).await),
        PredictorMode::Http => Arc::new(HttpPredictor::new(config.clone())?),
        PredictorMode::Mock => Arc::new(MockPredictor::heuristic()),
    };
    Ok(predictor)
}
