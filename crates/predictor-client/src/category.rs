//! Price Category Mapping

use crate::PredictorError;
use serde::{Deserialize, Serialize};

/// Image shown before any prediction or after a failure
pub const PLACEHOLDER_IMAGE: &str = "placeholder.svg";

/// Price category returned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCategory {
    /// Code 0
    Budget,
    /// Code 1
    LowerMidRange,
    /// Code 2
    UpperMidRange,
    /// Code 3
    Premium,
}

impl PriceCategory {
    /// All categories in code order
    pub const ALL: [PriceCategory; 4] = [
        PriceCategory::Budget,
        PriceCategory::LowerMidRange,
        PriceCategory::UpperMidRange,
        PriceCategory::Premium,
    ];

    /// Map a classifier code. There is no fallback category.
    pub fn from_code(code: i64) -> Result<Self, PredictorError> {
        match code {
            0 => Ok(PriceCategory::Budget),
            1 => Ok(PriceCategory::LowerMidRange),
            2 => Ok(PriceCategory::UpperMidRange),
            3 => Ok(PriceCategory::Premium),
            other => Err(PredictorError::UnknownCategory(other)),
        }
    }

    /// Classifier code
    pub fn code(&self) -> u8 {
        match self {
            PriceCategory::Budget => 0,
            PriceCategory::LowerMidRange => 1,
            PriceCategory::UpperMidRange => 2,
            PriceCategory::Premium => 3,
        }
    }

    /// Short label
    pub fn label(&self) -> &'static str {
        match self {
            PriceCategory::Budget => "Budget",
            PriceCategory::LowerMidRange => "Lower Mid-range",
            PriceCategory::UpperMidRange => "Upper Mid-range",
            PriceCategory::Premium => "Premium",
        }
    }

    /// Sentence shown on the result page
    pub fn description(&self) -> &'static str {
        match self {
            PriceCategory::Budget => "Budget mobile phone",
            PriceCategory::LowerMidRange => "Lower mid-range phone",
            PriceCategory::UpperMidRange => "Upper mid-range phone",
            PriceCategory::Premium => "Premium phone",
        }
    }

    /// Static image for the category
    pub fn image(&self) -> &'static str {
        match self {
            PriceCategory::Budget => "budget.jpg",
            PriceCategory::LowerMidRange => "lower-mid.jpg",
            PriceCategory::UpperMidRange => "upper-mid.jpg",
            PriceCategory::Premium => "premium.png",
        }
    }
}
