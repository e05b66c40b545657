//! Metrics recording.
//!
//! [`MetricsRecorder`] is the sink the orchestrator and adapters report to.
//! All methods take `&self`; implementations use interior mutability.
//! [`InMemoryMetrics`] keeps Prometheus-style labelled counters that can be
//! read back as a [`MetricsSnapshot`]; [`NoopMetrics`] discards everything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Sink for operational metrics
pub trait MetricsRecorder: Send + Sync + std::fmt::Debug {
    /// One source's part of a search finished
    fn record_search(&self, source: &str, success: bool, duration: Duration);

    /// One upstream API call finished (after retries)
    fn record_api_call(&self, api: &str, success: bool, duration: Duration);

    /// A cache lookup hit or missed
    fn record_cache(&self, source: &str, hit: bool);

    /// A request was refused by a rate gate or quota
    fn record_rate_limited(&self, resource: &str);

    /// An error was surfaced for a source
    fn record_error(&self, error_type: &str, source: &str);
}

/// Discards all metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn record_search(&self, _source: &str, _success: bool, _duration: Duration) {}
    fn record_api_call(&self, _api: &str, _success: bool, _duration: Duration) {}
    fn record_cache(&self, _source: &str, _hit: bool) {}
    fn record_rate_limited(&self, _resource: &str) {}
    fn record_error(&self, _error_type: &str, _source: &str) {}
}

/// Aggregated duration observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl DurationSummary {
    fn observe(&mut self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Mean duration in milliseconds
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms as f64 / self.count as f64
        }
    }
}

/// Point-in-time copy of all recorded metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counters keyed by `name{label=value,...}`
    pub counters: BTreeMap<String, u64>,
    /// Duration summaries keyed like counters
    pub durations: BTreeMap<String, DurationSummary>,
}

impl MetricsSnapshot {
    /// Value of one counter, 0 when never incremented
    pub fn counter(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// Keeps metrics in memory for the stats endpoints
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut MetricsSnapshot)) {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn increment(&self, key: String) {
        self.update(|m| *m.counters.entry(key).or_insert(0) += 1);
    }

    fn observe(&self, key: String, duration: Duration) {
        self.update(|m| m.durations.entry(key).or_default().observe(duration));
    }
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

impl MetricsRecorder for InMemoryMetrics {
    fn record_search(&self, source: &str, success: bool, duration: Duration) {
        self.increment(format!(
            "search_requests_total{{source={},status={}}}",
            source,
            status_label(success)
        ));
        self.observe(format!("search_duration{{source={}}}", source), duration);
    }

    fn record_api_call(&self, api: &str, success: bool, duration: Duration) {
        self.increment(format!(
            "api_calls_total{{api={},status={}}}",
            api,
            status_label(success)
        ));
        self.observe(format!("api_call_duration{{api={}}}", api), duration);
    }

    fn record_cache(&self, source: &str, hit: bool) {
        let name = if hit { "cache_hits_total" } else { "cache_misses_total" };
        self.increment(format!("{}{{source={}}}", name, source));
    }

    fn record_rate_limited(&self, resource: &str) {
        self.increment(format!("rate_limited_total{{resource={}}}", resource));
    }

    fn record_error(&self, error_type: &str, source: &str) {
        self.increment(format!(
            "errors_total{{type={},source={}}}",
            error_type, source
        ));
    }
}
