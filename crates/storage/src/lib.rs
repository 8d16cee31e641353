//! Storage Layer
//!
//! In-memory prediction cache and prediction log with repository pattern.

mod repository;

pub use repository::{
    feature_key, CacheStats, CachedPrediction, PredictionLogRecord, Repository,
    RepositoryLimits,
};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
