//! Repository Implementation

use crate::StorageError;
use chrono::{DateTime, Duration, Utc};
use feature_validator::ValidatedRequest;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Cached classifier answer for one feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPrediction {
    pub feature_key: String,
    pub category_code: u8,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

/// One prediction attempt, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLogRecord {
    pub id: i64,
    pub request_id: Uuid,
    pub feature_key: Option<String>,
    pub category_code: Option<u8>,
    pub response_time_ms: f64,
    pub success: bool,
    pub from_cache: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_predictions: usize,
    pub total_accesses: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub recent_predictions_24h: usize,
    pub logged_requests: usize,
}

impl CacheStats {
    /// Hits over lookups, 0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// Capacity limits
#[derive(Debug, Clone, Copy)]
pub struct RepositoryLimits {
    /// Max cached predictions before evicting the least recently accessed
    pub max_cache_entries: usize,
    /// Max prediction log records kept
    pub max_log_records: usize,
}

impl Default for RepositoryLimits {
    fn default() -> Self {
        Self {
            max_cache_entries: 10_000,
            max_log_records: 10_000,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedPrediction>,
    hits: u64,
    misses: u64,
}

#[derive(Default)]
struct LogState {
    records: VecDeque<PredictionLogRecord>,
    next_id: i64,
}

/// Canonical cache key for a feature vector
pub fn feature_key(request: &ValidatedRequest) -> Result<String, StorageError> {
    serde_json::to_string(request).map_err(|e| StorageError::SerializationError(e.to_string()))
}

/// Repository for prediction data (in-memory)
pub struct Repository {
    cache: Mutex<CacheState>,
    log: Mutex<LogState>,
    limits: RepositoryLimits,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::LockPoisoned(e.to_string()))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_limits(RepositoryLimits::default())
    }

    /// Create a repository with explicit capacity limits
    pub fn with_limits(limits: RepositoryLimits) -> Self {
        info!(
            "Creating in-memory repository (cache={}, log={})",
            limits.max_cache_entries, limits.max_log_records
        );
        Self {
            cache: Mutex::new(CacheState::default()),
            log: Mutex::new(LogState {
                records: VecDeque::new(),
                next_id: 1,
            }),
            limits,
        }
    }

    /// Look up a cached prediction, bumping its access count on a hit
    pub fn get_cached(&self, key: &str) -> Result<Option<CachedPrediction>, StorageError> {
        let mut cache = lock(&self.cache)?;

        let hit = cache.entries.get_mut(key).map(|entry| {
            entry.access_count += 1;
            entry.last_accessed = Utc::now();
            entry.clone()
        });

        if hit.is_some() {
            cache.hits += 1;
            debug!("Cache hit for {}", key);
        } else {
            cache.misses += 1;
        }
        Ok(hit)
    }

    /// Store a classifier answer. An existing entry only gets its access
    /// count bumped.
    pub fn cache_prediction(
        &self,
        key: &str,
        category_code: u8,
        label: &str,
    ) -> Result<(), StorageError> {
        self.cache_prediction_at(key, category_code, label, Utc::now())
    }

    fn cache_prediction_at(
        &self,
        key: &str,
        category_code: u8,
        label: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut cache = lock(&self.cache)?;

        if let Some(entry) = cache.entries.get_mut(key) {
            entry.access_count += 1;
            entry.last_accessed = now;
            return Ok(());
        }

        // Enforce capacity
        while cache.entries.len() >= self.limits.max_cache_entries.max(1) {
            let oldest = cache
                .entries
                .values()
                .min_by_key(|e| e.last_accessed)
                .map(|e| e.feature_key.clone());
            match oldest {
                Some(k) => {
                    cache.entries.remove(&k);
                }
                None => break,
            }
        }

        cache.entries.insert(
            key.to_string(),
            CachedPrediction {
                feature_key: key.to_string(),
                category_code,
                label: label.to_string(),
                created_at: now,
                last_accessed: now,
                access_count: 1,
            },
        );
        Ok(())
    }

    /// Append a prediction log record and return its id
    pub fn log_prediction(&self, mut record: PredictionLogRecord) -> Result<i64, StorageError> {
        let mut log = lock(&self.log)?;

        record.id = log.next_id;
        log.next_id += 1;

        // Enforce retention
        while log.records.len() >= self.limits.max_log_records.max(1) {
            log.records.pop_front();
        }

        let id = record.id;
        log.records.push_back(record);
        Ok(id)
    }

    /// Most recent log records, newest first
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<PredictionLogRecord>, StorageError> {
        let log = lock(&self.log)?;
        Ok(log.records.iter().rev().take(limit).cloned().collect())
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> Result<CacheStats, StorageError> {
        let since = Utc::now() - Duration::hours(24);
        let cache = lock(&self.cache)?;
        let logged_requests = lock(&self.log)?.records.len();

        Ok(CacheStats {
            total_predictions: cache.entries.len(),
            total_accesses: cache.entries.values().map(|e| e.access_count).sum(),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            recent_predictions_24h: cache
                .entries
                .values()
                .filter(|e| e.created_at > since)
                .count(),
            logged_requests,
        })
    }

    /// Remove cache entries created more than `days` days ago
    pub fn cleanup_older_than(&self, days: u32) -> Result<usize, StorageError> {
        self.cleanup_older_than_at(days, Utc::now())
    }

    fn cleanup_older_than_at(&self, days: u32, now: DateTime<Utc>) -> Result<usize, StorageError> {
        // an age past chrono's range keeps every entry
        let Some(cutoff) =
            Duration::try_days(i64::from(days)).and_then(|age| now.checked_sub_signed(age))
        else {
            debug!("Cleanup age of {} days predates any entry", days);
            return Ok(0);
        };
        let mut cache = lock(&self.cache)?;

        let before = cache.entries.len();
        cache.entries.retain(|_, e| e.created_at >= cutoff);
        let removed = before - cache.entries.len();

        info!("Cleaned up {} cached predictions older than {} days", removed, days);
        Ok(removed)
    }

    /// Number of cached predictions
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.entries.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_validator::{validate_and_build, FEATURE_SPECS};

    fn log_record(success: bool) -> PredictionLogRecord {
        PredictionLogRecord {
            id: 0,
            request_id: Uuid::new_v4(),
            feature_key: None,
            category_code: success.then_some(2),
            response_time_ms: 12.5,
            success,
            from_cache: false,
            error_message: (!success).then(|| "timeout".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_feature_key_is_canonical() {
        let form: HashMap<String, String> = FEATURE_SPECS
            .iter()
            .map(|s| (s.name.to_string(), "1".to_string()))
            .collect();
        let request = validate_and_build(&form).unwrap();
        let key = feature_key(&request).unwrap();
        assert_eq!(key, feature_key(&request.clone()).unwrap());
        assert!(key.starts_with("[1,1,1.0,"));
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let repo = Repository::new();
        assert!(repo.get_cached("k").unwrap().is_none());

        repo.cache_prediction("k", 3, "Premium").unwrap();
        let hit = repo.get_cached("k").unwrap().unwrap();
        assert_eq!(hit.category_code, 3);
        assert_eq!(hit.access_count, 2);

        let stats = repo.cache_stats().unwrap();
        assert_eq!(stats.total_predictions, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.recent_predictions_24h, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_insert_existing_bumps_count() {
        let repo = Repository::new();
        repo.cache_prediction("k", 1, "Lower Mid-range").unwrap();
        repo.cache_prediction("k", 1, "Lower Mid-range").unwrap();
        assert_eq!(repo.cache_len(), 1);
        assert_eq!(repo.cache_stats().unwrap().total_accesses, 2);
    }

    #[test]
    fn test_cache_evicts_least_recently_accessed() {
        let repo = Repository::with_limits(RepositoryLimits {
            max_cache_entries: 2,
            max_log_records: 10,
        });
        let t0 = Utc::now() - Duration::minutes(10);
        repo.cache_prediction_at("a", 0, "Budget", t0).unwrap();
        repo.cache_prediction_at("b", 1, "Lower Mid-range", t0 + Duration::minutes(1))
            .unwrap();
        // touch "a" so "b" becomes the oldest
        repo.get_cached("a").unwrap();
        repo.cache_prediction("c", 2, "Upper Mid-range").unwrap();

        assert_eq!(repo.cache_len(), 2);
        assert!(repo.get_cached("a").unwrap().is_some());
        assert!(repo.get_cached("b").unwrap().is_none());
    }

    #[test]
    fn test_cleanup_old_entries() {
        let repo = Repository::new();
        let now = Utc::now();
        repo.cache_prediction_at("old", 0, "Budget", now - Duration::days(40))
            .unwrap();
        repo.cache_prediction_at("new", 3, "Premium", now - Duration::days(2))
            .unwrap();

        assert_eq!(repo.cleanup_older_than_at(30, now).unwrap(), 1);
        assert_eq!(repo.cache_len(), 1);
        assert_eq!(repo.cleanup_older_than_at(1, now).unwrap(), 1);
        assert_eq!(repo.cache_len(), 0);
    }

    #[test]
    fn test_cleanup_with_huge_age() {
        let repo = Repository::new();
        repo.cache_prediction("k", 1, "Lower Mid-range").unwrap();

        assert_eq!(repo.cleanup_older_than(u32::MAX).unwrap(), 0);
        assert_eq!(repo.cache_len(), 1);
    }

    #[test]
    fn test_log_ids_and_order() {
        let repo = Repository::new();
        assert_eq!(repo.log_prediction(log_record(true)).unwrap(), 1);
        assert_eq!(repo.log_prediction(log_record(false)).unwrap(), 2);

        let logs = repo.recent_logs(10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, 2);
        assert!(!logs[0].success);
    }

    #[test]
    fn test_log_retention_limit() {
        let repo = Repository::with_limits(RepositoryLimits {
            max_cache_entries: 10,
            max_log_records: 5,
        });
        for _ in 0..10 {
            repo.log_prediction(log_record(true)).unwrap();
        }
        let logs = repo.recent_logs(100).unwrap();
        assert_eq!(logs.len(), 5);
        assert_eq!(logs[0].id, 10);
        assert_eq!(repo.cache_stats().unwrap().logged_requests, 5);
    }
}
