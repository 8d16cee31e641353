//! Local predictor for development and tests

use crate::{PriceCategory, Predictor, PredictorError};
use async_trait::async_trait;
use feature_validator::ValidatedRequest;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Always answer this raw code (may be out of range)
    Fixed(i64),
    /// Rank by RAM, the dominant feature of the trained model
    Heuristic,
    /// Always fail as if the endpoint were down
    Unavailable,
}

/// Predictor that never leaves the process
pub struct MockPredictor {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockPredictor {
    /// Always return the given raw code
    pub fn fixed(code: i64) -> Self {
        Self::with_behavior(Behavior::Fixed(code))
    }

    /// Rule-based answers from the RAM feature
    pub fn heuristic() -> Self {
        info!("Creating mock predictor (heuristic mode)");
        Self::with_behavior(Behavior::Heuristic)
    }

    /// Always fail with [`PredictorError::Unreachable`]
    pub fn unavailable() -> Self {
        Self::with_behavior(Behavior::Unavailable)
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of predictions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn heuristic_code(request: &ValidatedRequest) -> i64 {
        let ram = request.get("ram").map(|v| v.as_f64()).unwrap_or(0.0);
        if ram < 1000.0 {
            0
        } else if ram < 2000.0 {
            1
        } else if ram < 3000.0 {
            2
        } else {
            3
        }
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, request: &ValidatedRequest) -> Result<PriceCategory, PredictorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let code = match self.behavior {
            Behavior::Fixed(code) => code,
            Behavior::Heuristic => Self::heuristic_code(request),
            Behavior::Unavailable => {
                return Err(PredictorError::Unreachable("mock endpoint offline".into()))
            }
        };
        debug!("Mock prediction: code {}", code);
        PriceCategory::from_code(code)
    }

    fn describe(&self) -> String {
        match self.behavior {
            Behavior::Fixed(code) => format!("mock:fixed({code})"),
            Behavior::Heuristic => "mock:heuristic".to_string(),
            Behavior::Unavailable => "mock:unavailable".to_string(),
        }
    }
}
