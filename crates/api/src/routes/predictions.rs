//! Prediction Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feature_validator::{FeatureSpec, FieldError, FEATURE_SPECS};
use predictor_client::PriceCategory;
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::service::{PredictError, TRY_AGAIN_MESSAGE};
use crate::AppState;

/// Successful prediction
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub request_id: Uuid,
    pub category: PriceCategory,
    pub code: u8,
    pub label: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub from_cache: bool,
    pub latency_ms: f64,
}

/// Failed prediction
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            PredictError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: "validation",
                    message: e.to_string(),
                    fields: e.errors().to_vec(),
                },
            ),
            PredictError::PredictorUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "predictor_unavailable",
                    message: TRY_AGAIN_MESSAGE.to_string(),
                    fields: Vec::new(),
                },
            ),
            PredictError::Unexpected(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "unexpected",
                    message: TRY_AGAIN_MESSAGE.to_string(),
                    fields: Vec::new(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Convert JSON field values to the raw text the validator expects.
/// Nulls count as missing; booleans become 1/0.
fn to_raw_fields(body: HashMap<String, Value>) -> HashMap<String, String> {
    body.into_iter()
        .filter_map(|(key, value)| {
            let raw = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => String::from(if b { "1" } else { "0" }),
                Value::Number(n) => number_text(&n),
                other => other.to_string(),
            };
            Some((key, raw))
        })
        .collect()
}

/// Plain decimal text for a JSON number. Floats never use exponent form
/// and always keep a decimal point.
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => {
            let text = f.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
        None => n.to_string(),
    }
}

/// Classify one phone
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HashMap<String, Value>>,
) -> Result<Json<PredictResponse>, PredictError> {
    let fields = to_raw_fields(body);
    let outcome = state.service.predict(&fields).await?;
    let category = outcome.category;

    Ok(Json(PredictResponse {
        request_id: outcome.request_id,
        category,
        code: category.code(),
        label: category.label(),
        description: category.description(),
        image: category.image(),
        from_cache: outcome.from_cache,
        latency_ms: outcome.latency_ms,
    }))
}

/// Field table in predictor order
pub async fn list_features() -> Json<Vec<FeatureSpec>> {
    Json(FEATURE_SPECS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_raw_fields() {
        let body: HashMap<String, Value> = serde_json::from_value(json!({
            "ram": 2000,
            "clock_speed": 1.5,
            "blue": true,
            "wifi": "1",
            "pc": null,
        }))
        .unwrap();

        let raw = to_raw_fields(body);
        assert_eq!(raw["ram"], "2000");
        assert_eq!(raw["clock_speed"], "1.5");
        assert_eq!(raw["blue"], "1");
        assert_eq!(raw["wifi"], "1");
        assert!(!raw.contains_key("pc"));
    }

    #[test]
    fn test_small_floats_stay_decimal() {
        let body: HashMap<String, Value> = serde_json::from_value(json!({
            "m_dep": 0.0000001,
            "clock_speed": 2.0,
            "battery_power": 1500,
        }))
        .unwrap();

        let raw = to_raw_fields(body);
        assert_eq!(raw["m_dep"], "0.0000001");
        assert_eq!(raw["clock_speed"], "2.0");
        assert_eq!(raw["battery_power"], "1500");
    }
}
