//! Request validation and feature-vector assembly

use crate::error::{FieldError, ValidationError};
use crate::normalizer::{parse_value, FeatureValue};
use crate::spec::{feature_spec, FEATURE_COUNT, FEATURE_SPECS};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use tracing::debug;

/// Source of raw field text, keyed by field name
pub trait RawFields {
    /// Raw text for a field, `None` if absent
    fn raw(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> RawFields for HashMap<String, String, S> {
    fn raw(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RawFields for BTreeMap<String, String> {
    fn raw(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RawFields for [(&str, &str)] {
    fn raw(&self, name: &str) -> Option<&str> {
        self.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
    }
}

/// Feature vector in model training order. Only produced by
/// [`validate_and_build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedRequest {
    values: [FeatureValue; FEATURE_COUNT],
}

impl ValidatedRequest {
    /// Values in predictor order
    pub fn values(&self) -> &[FeatureValue; FEATURE_COUNT] {
        &self.values
    }

    /// Values as plain numbers in predictor order
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().map(FeatureValue::as_f64).collect()
    }

    /// Value of a named field
    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        feature_spec(name).map(|spec| self.values[spec.position])
    }
}

/// Validate all 20 fields and assemble the ordered feature vector.
///
/// Every failing field is reported, in table order; validation never stops
/// at the first problem. Blank values count as missing.
pub fn validate_and_build<R>(raw: &R) -> Result<ValidatedRequest, ValidationError>
where
    R: RawFields + ?Sized,
{
    let mut values = [FeatureValue::Integer(0); FEATURE_COUNT];
    let mut errors = Vec::new();

    for spec in FEATURE_SPECS.iter() {
        let parsed = match raw.raw(spec.name) {
            Some(text) if !text.trim().is_empty() => parse_value(spec, text),
            _ => Err(FieldError::Missing { field: spec.name }),
        };

        match parsed {
            Ok(value) => values[spec.position] = value,
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(ValidatedRequest { values })
    } else {
        debug!("Validation failed for {} field(s)", errors.len());
        Err(ValidationError::new(errors))
    }
}
