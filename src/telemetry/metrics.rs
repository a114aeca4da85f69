//! Metrics
//!
//! Client metrics collection interfaces and implementations.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// Metric names recorded by the client.
pub struct MetricNames;

impl MetricNames {
    pub const REQUESTS: &'static str = "api_client.requests";
    pub const REFRESHES: &'static str = "api_client.token_refreshes";
    pub const QUEUED: &'static str = "api_client.requests_queued";
    pub const REPLAYS: &'static str = "api_client.requests_replayed";
}

/// Client metrics interface.
pub trait ClientMetrics: Send + Sync {
    /// Record a completed request with the status its caller received,
    /// after any refresh and replay (503 when no response arrived).
    fn record_request(&self, method: &str, status: u16);

    /// Record a settled refresh exchange.
    fn record_refresh(&self, success: bool);

    /// Record a request queued behind an in-flight refresh.
    fn record_request_queued(&self, queue_depth: usize);

    /// Record a replay after refresh.
    fn record_replay(&self, success: bool);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl ClientMetrics for NoOpMetrics {
    fn record_request(&self, _method: &str, _status: u16) {}
    fn record_refresh(&self, _success: bool) {}
    fn record_request_queued(&self, _queue_depth: usize) {}
    fn record_replay(&self, _success: bool) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Count entries by name whose `outcome` label matches.
    pub fn count_outcome(&self, name: &str, outcome: &str) -> usize {
        self.get_entries_by_name(name)
            .iter()
            .filter(|e| e.labels.get("outcome").map(String::as_str) == Some(outcome))
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, name: &str, value: f64, labels: MetricLabels) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        self.entries.lock().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
            timestamp: now,
        });
    }
}

fn outcome_labels(success: bool) -> MetricLabels {
    let outcome = if success { "success" } else { "failure" };
    [("outcome".to_string(), outcome.to_string())]
        .into_iter()
        .collect()
}

impl ClientMetrics for InMemoryMetrics {
    fn record_request(&self, method: &str, status: u16) {
        let mut labels = MetricLabels::new();
        labels.insert("method".to_string(), method.to_string());
        labels.insert("status".to_string(), status.to_string());
        self.record(MetricNames::REQUESTS, 1.0, labels);
    }

    fn record_refresh(&self, success: bool) {
        self.record(MetricNames::REFRESHES, 1.0, outcome_labels(success));
    }

    fn record_request_queued(&self, queue_depth: usize) {
        self.record(MetricNames::QUEUED, queue_depth as f64, MetricLabels::new());
    }

    fn record_replay(&self, success: bool) {
        self.record(MetricNames::REPLAYS, 1.0, outcome_labels(success));
    }
}

/// Create in-memory metrics.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}
