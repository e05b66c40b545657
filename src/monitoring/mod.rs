//! Usage accounting, metrics, audit events and service health.

pub mod audit;
mod health;
mod metrics;
mod usage;

pub use health::{CacheStatus, HealthStatus, ServiceStatus, SourceStatus};
pub use metrics::{DurationSummary, InMemoryMetrics, MetricsRecorder, MetricsSnapshot, NoopMetrics};
pub use usage::{ProviderUsage, UsageReport, UsageTracker};

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// Combined usage report returned by the stats endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub usage: UsageReport,
    pub cache: CacheStats,
    pub metrics: MetricsSnapshot,
}
