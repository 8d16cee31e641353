//! Text-to-number coercion for form fields

use crate::error::FieldError;
use crate::spec::{FeatureKind, FeatureSpec};
use serde::Serialize;
use std::num::IntErrorKind;

/// A coerced feature value, keeping the declared representation so the
/// predictor payload carries `1000` rather than `1000.0` for integer fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
}

impl FeatureValue {
    /// Numeric value as f64
    pub fn as_f64(&self) -> f64 {
        match *self {
            FeatureValue::Integer(v) => v as f64,
            FeatureValue::Float(v) => v,
        }
    }
}

/// Parse raw text as the declared type of `spec`, then range-check it.
///
/// Integer fields reject fractional text. Float fields accept integer and
/// plain decimal text. Thousands separators, exponents and non-finite values
/// are rejected for both.
pub fn parse_value(spec: &FeatureSpec, raw: &str) -> Result<FeatureValue, FieldError> {
    let text = raw.trim();
    let invalid = || FieldError::InvalidType {
        field: spec.name,
        expected: spec.kind,
        raw: raw.to_string(),
    };

    let value = match spec.kind {
        FeatureKind::Integer => {
            if !is_plain_number(text, false) {
                return Err(invalid());
            }
            match text.parse::<i64>() {
                Ok(v) => FeatureValue::Integer(v),
                // digits that overflow i64 are far outside any range
                Err(e)
                    if matches!(
                        e.kind(),
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                    ) =>
                {
                    return Err(FieldError::OutOfRange {
                        field: spec.name,
                        value: text.parse::<f64>().map_err(|_| invalid())?,
                        min: spec.min,
                        max: spec.max,
                    });
                }
                Err(_) => return Err(invalid()),
            }
        }
        FeatureKind::Float => {
            if !is_plain_number(text, true) {
                return Err(invalid());
            }
            let parsed = text.parse::<f64>().map_err(|_| invalid())?;
            if !parsed.is_finite() {
                return Err(invalid());
            }
            FeatureValue::Float(parsed)
        }
    };

    let numeric = value.as_f64();
    if !spec.contains(numeric) {
        return Err(FieldError::OutOfRange {
            field: spec.name,
            value: numeric,
            min: spec.min,
            max: spec.max,
        });
    }

    Ok(value)
}

/// Optional sign, digits, and (for decimals) at most one point with at
/// least one digit somewhere
fn is_plain_number(text: &str, allow_point: bool) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut digits = 0;
    let mut points = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' if allow_point => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::feature_spec;

    fn spec(name: &str) -> &'static FeatureSpec {
        feature_spec(name).unwrap()
    }

    #[test]
    fn test_integer_field() {
        assert_eq!(
            parse_value(spec("ram"), "2000"),
            Ok(FeatureValue::Integer(2000))
        );
        assert_eq!(
            parse_value(spec("ram"), " 2000 "),
            Ok(FeatureValue::Integer(2000))
        );
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let err = parse_value(spec("n_cores"), "4.5").unwrap_err();
        assert!(matches!(
            err,
            FieldError::InvalidType {
                field: "n_cores",
                expected: FeatureKind::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_float_accepts_integer_text() {
        assert_eq!(
            parse_value(spec("clock_speed"), "2"),
            Ok(FeatureValue::Float(2.0))
        );
        assert_eq!(
            parse_value(spec("m_dep"), ".5"),
            Ok(FeatureValue::Float(0.5))
        );
    }

    #[test]
    fn test_rejects_locale_and_exotic_formats() {
        for raw in ["1,000", "1e3", "inf", "NaN", "", "-", ".", "1.2.3", "0x10"] {
            assert!(
                matches!(
                    parse_value(spec("battery_power"), raw),
                    Err(FieldError::InvalidType { .. })
                ),
                "{raw:?} should be rejected"
            );
        }
        assert!(parse_value(spec("clock_speed"), "1,5").is_err());
        assert!(parse_value(spec("clock_speed"), "1e1").is_err());
    }

    #[test]
    fn test_negative_out_of_range() {
        assert_eq!(
            parse_value(spec("fc"), "-1"),
            Err(FieldError::OutOfRange {
                field: "fc",
                value: -1.0,
                min: 0.0,
                max: 200.0,
            })
        );
    }

    #[test]
    fn test_integer_overflow_is_out_of_range() {
        assert!(matches!(
            parse_value(spec("ram"), "100000000000000000000"),
            Err(FieldError::OutOfRange { field: "ram", value, .. }) if value == 1e20
        ));
        assert!(matches!(
            parse_value(spec("ram"), "-100000000000000000000"),
            Err(FieldError::OutOfRange { field: "ram", .. })
        ));
    }

    #[test]
    fn test_flag_bounds() {
        assert!(parse_value(spec("wifi"), "0").is_ok());
        assert!(parse_value(spec("wifi"), "1").is_ok());
        assert!(matches!(
            parse_value(spec("wifi"), "2"),
            Err(FieldError::OutOfRange { field: "wifi", .. })
        ));
    }

    #[test]
    fn test_serialized_representation() {
        let values = [FeatureValue::Integer(1000), FeatureValue::Float(1.5)];
        assert_eq!(serde_json::to_string(&values).unwrap(), "[1000,1.5]");
    }
}
