//! Service status reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::SourceKind;

/// Overall or per-component health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(label)
    }
}

/// Status of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: SourceKind,
    pub name: String,
    pub configured: bool,
    pub status: HealthStatus,
    /// Calls left today, `None` when unlimited or unconfigured
    pub quota_remaining: Option<u64>,
    /// Outcome of the live probe, when one was run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_error: Option<String>,
}

/// Status of the cache layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub backend: String,
    pub enabled: bool,
    pub status: HealthStatus,
}

/// Whole-service status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub checked_at: DateTime<Utc>,
    pub sources: Vec<SourceStatus>,
    pub cache: CacheStatus,
}

impl ServiceStatus {
    /// Combine component states.
    ///
    /// Unhealthy when no provider is usable, degraded when any provider or
    /// the cache is not healthy, healthy otherwise.
    pub fn overall(sources: &[SourceStatus], cache: &CacheStatus) -> HealthStatus {
        let usable = sources
            .iter()
            .filter(|s| s.configured && s.status != HealthStatus::Unhealthy)
            .count();
        if usable == 0 {
            return HealthStatus::Unhealthy;
        }
        let all_healthy = sources.iter().all(|s| s.status == HealthStatus::Healthy);
        if all_healthy && cache.status == HealthStatus::Healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}
