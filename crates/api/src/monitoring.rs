//! Request metrics and error log
//!
//! Keeps a bounded in-process history for the admin endpoints and mirrors
//! every sample into the `metrics` facade for Prometheus export.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

/// Slope (ms per sample) above which response time counts as changing
const TREND_THRESHOLD: f64 = 0.1;

/// One handled prediction request
#[derive(Debug, Clone, Serialize)]
pub struct RequestSample {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: f64,
    pub success: bool,
}

/// One recorded error
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub message: String,
}

/// Direction of a metric over the last hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    fn of(values: &[f64]) -> Self {
        if values.len() < 2 {
            return Trend::Stable;
        }
        let slope = (values[values.len() - 1] - values[0]) / values.len() as f64;
        if slope > TREND_THRESHOLD {
            Trend::Increasing
        } else if slope < -TREND_THRESHOLD {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

/// Point-in-time summary
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub request_trend: Trend,
    pub response_time_trend: Trend,
    pub failure_trend: Trend,
    pub total_errors: u64,
    pub timestamp: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Successful over total, 1.0 when idle
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Default)]
struct Inner {
    samples: VecDeque<RequestSample>,
    errors: VecDeque<ErrorEntry>,
    total: u64,
    successful: u64,
    failed: u64,
    total_errors: u64,
}

/// Collector for request and error metrics
pub struct MetricsCollector {
    inner: Mutex<Inner>,
    max_history: usize,
}

impl MetricsCollector {
    /// Create a collector keeping at most `max_history` samples and errors
    pub fn new(max_history: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_history: max_history.max(1),
        }
    }

    /// Record a handled request
    pub fn record_request(&self, latency_ms: f64, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        metrics::counter!("price_predictor_requests_total", "outcome" => outcome).increment(1);
        metrics::histogram!("price_predictor_request_duration_ms").record(latency_ms);

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.total += 1;
        if success {
            inner.successful += 1;
        } else {
            inner.failed += 1;
        }
        if inner.samples.len() >= self.max_history {
            inner.samples.pop_front();
        }
        inner.samples.push_back(RequestSample {
            timestamp: Utc::now(),
            latency_ms,
            success,
        });
    }

    /// Record an error by kind
    pub fn record_error(&self, kind: &str, message: &str) {
        warn!("Error recorded: {} - {}", kind, message);
        metrics::counter!("price_predictor_errors_total", "kind" => kind.to_string()).increment(1);

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.total_errors += 1;
        if inner.errors.len() >= self.max_history {
            inner.errors.pop_front();
        }
        inner.errors.push_back(ErrorEntry {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }

    /// Current totals and last-hour trends
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Utc::now();
        let Ok(inner) = self.inner.lock() else {
            return MetricsSnapshot {
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                average_response_time_ms: 0.0,
                request_trend: Trend::Stable,
                response_time_trend: Trend::Stable,
                failure_trend: Trend::Stable,
                total_errors: 0,
                timestamp: now,
            };
        };

        let average = if inner.samples.is_empty() {
            0.0
        } else {
            inner.samples.iter().map(|s| s.latency_ms).sum::<f64>() / inner.samples.len() as f64
        };

        let hour_ago = now - Duration::hours(1);
        let recent: Vec<&RequestSample> = inner
            .samples
            .iter()
            .filter(|s| s.timestamp > hour_ago)
            .collect();
        let request_counts: Vec<f64> = (1..=recent.len()).map(|n| n as f64).collect();
        let latencies: Vec<f64> = recent.iter().map(|s| s.latency_ms).collect();
        let mut failures = 0.0;
        let cumulative_failures: Vec<f64> = recent
            .iter()
            .map(|s| {
                if !s.success {
                    failures += 1.0;
                }
                failures
            })
            .collect();

        MetricsSnapshot {
            total_requests: inner.total,
            successful_requests: inner.successful,
            failed_requests: inner.failed,
            average_response_time_ms: average,
            request_trend: Trend::of(&request_counts),
            response_time_trend: Trend::of(&latencies),
            failure_trend: Trend::of(&cumulative_failures),
            total_errors: inner.total_errors,
            timestamp: now,
        }
    }

    /// Samples from the last `hours` hours, oldest first
    pub fn history(&self, hours: u32) -> Vec<RequestSample> {
        // None when the window reaches past chrono's range: keep everything
        let cutoff = Duration::try_hours(i64::from(hours))
            .and_then(|window| Utc::now().checked_sub_signed(window));
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .samples
                    .iter()
                    .filter(|s| cutoff.map_or(true, |c| s.timestamp > c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last `limit` errors, oldest first
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorEntry> {
        self.inner
            .lock()
            .map(|inner| {
                let skip = inner.errors.len().saturating_sub(limit);
                inner.errors.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_average() {
        let collector = MetricsCollector::new(100);
        collector.record_request(10.0, true);
        collector.record_request(30.0, false);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert!((snapshot.average_response_time_ms - 20.0).abs() < 1e-9);
        assert!((snapshot.success_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_history_bounded() {
        let collector = MetricsCollector::new(3);
        for i in 0..5 {
            collector.record_request(i as f64, true);
        }
        let history = collector.history(24);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].latency_ms, 2.0);
        // totals are not bounded by history
        assert_eq!(collector.snapshot().total_requests, 5);
    }

    #[test]
    fn test_recent_errors() {
        let collector = MetricsCollector::new(10);
        for i in 0..4 {
            collector.record_error("predictor_unavailable", &format!("attempt {i}"));
        }
        let errors = collector.recent_errors(2);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].message, "attempt 3");
        assert_eq!(collector.snapshot().total_errors, 4);
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::of(&[]), Trend::Stable);
        assert_eq!(Trend::of(&[10.0, 20.0, 40.0]), Trend::Increasing);
        assert_eq!(Trend::of(&[40.0, 20.0, 10.0]), Trend::Decreasing);
        assert_eq!(Trend::of(&[10.0, 10.1, 10.0]), Trend::Stable);
    }

    #[test]
    fn test_response_time_trend_from_samples() {
        let collector = MetricsCollector::new(10);
        for latency in [5.0, 10.0, 50.0] {
            collector.record_request(latency, true);
        }
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.response_time_trend, Trend::Increasing);
        assert_eq!(snapshot.failure_trend, Trend::Stable);
    }

    #[test]
    fn test_request_trend() {
        let collector = MetricsCollector::new(10);
        collector.record_request(5.0, true);
        assert_eq!(collector.snapshot().request_trend, Trend::Stable);

        collector.record_request(5.0, false);
        collector.record_request(5.0, true);
        assert_eq!(collector.snapshot().request_trend, Trend::Increasing);
    }

    #[test]
    fn test_history_with_huge_window() {
        let collector = MetricsCollector::new(10);
        collector.record_request(5.0, true);
        collector.record_request(7.0, true);
        assert_eq!(collector.history(u32::MAX).len(), 2);
    }
}
