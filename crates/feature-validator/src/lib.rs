//! Feature Validation and Normalization
//!
//! Turns raw form fields into the ordered feature vector the remote price
//! classifier was trained on.

mod error;
mod normalizer;
mod spec;
mod validator;

pub use error::{FieldError, ValidationError};
pub use normalizer::{parse_value, FeatureValue};
pub use spec::{feature_spec, FeatureKind, FeatureSpec, FEATURE_COUNT, FEATURE_SPECS};
pub use validator::{validate_and_build, RawFields, ValidatedRequest};
