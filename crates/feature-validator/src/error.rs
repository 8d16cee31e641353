//! Validation Error Types

use crate::spec::FeatureKind;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single field
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    /// Key absent or blank
    #[error("Missing required field: {field}")]
    Missing { field: &'static str },

    /// Text does not parse as the declared type
    #[error("{field} must be a valid {expected}, got {raw:?}")]
    InvalidType {
        field: &'static str,
        expected: FeatureKind,
        raw: String,
    },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl FieldError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Missing { field }
            | FieldError::InvalidType { field, .. }
            | FieldError::OutOfRange { field, .. } => field,
        }
    }
}

/// Every field failure found in one validation pass
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{} field(s) failed validation: {}", .errors.len(), summary(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    /// Field failures in table order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the offending fields
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(FieldError::field).collect()
    }

    /// Failure for a given field, if any
    pub fn for_field(&self, name: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field() == name)
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = FieldError::OutOfRange {
            field: "blue",
            value: 2.0,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "blue value 2 is out of range [0, 1]");
    }

    #[test]
    fn test_invalid_type_message() {
        let err = FieldError::InvalidType {
            field: "clock_speed",
            expected: FeatureKind::Float,
            raw: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "clock_speed must be a valid float, got \"abc\""
        );
    }

    #[test]
    fn test_aggregate_message_lists_all() {
        let err = ValidationError::new(vec![
            FieldError::Missing { field: "ram" },
            FieldError::OutOfRange {
                field: "wifi",
                value: 5.0,
                min: 0.0,
                max: 1.0,
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("2 field(s)"));
        assert!(message.contains("ram"));
        assert!(message.contains("wifi"));
        assert_eq!(err.fields(), ["ram", "wifi"]);
    }
}
