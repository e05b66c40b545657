//! Search provider adapters with a shared trait-based architecture.
//!
//! This module defines the [`Source`] trait that every provider adapter
//! implements. Three adapters ship with the crate:
//!
//! - [`ScholarSource`]: academic papers scraped from Google Scholar
//! - [`WebSearchSource`]: Google Custom Search JSON API
//! - [`YouTubeSource`]: YouTube Data API v3
//!
//! Adapters are constructed from [`Config`](crate::config::Config) by
//! [`SourceRegistry::from_config`]. A provider whose credentials are missing
//! is simply not registered, and the orchestrator reports it as unavailable.
//!
//! Every adapter follows the same call pattern: clamp the result count,
//! look the request up in the [`CacheStore`](crate::cache::CacheStore), call
//! upstream through [`with_retry`](crate::utils::with_retry) on a miss, parse
//! the response into [`SearchResult`]s (skipping malformed items), and write
//! the parsed list back to the cache.

mod registry;
mod scholar;
mod web;
mod youtube;

pub mod mock;

pub use mock::MockSource;
pub use registry::{SourceCapabilities, SourceContext, SourceRegistry};
pub use scholar::ScholarSource;
pub use web::WebSearchSource;
pub use youtube::YouTubeSource;

use crate::models::{AuthorProfile, SearchFilters, SearchResult, SourceKind};
use crate::utils::validate::ValidationError;
use async_trait::async_trait;
use std::time::Duration;

/// The Source trait defines the interface for all search provider adapters.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Implement `kind`, `max_results` and `search`
/// 3. Override `author_info` / `health_check` if the provider supports them
/// 4. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Which provider kind this adapter serves
    fn kind(&self) -> SourceKind;

    /// Unique identifier for this source
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this source supports author profile lookup
    fn supports_author_lookup(&self) -> bool {
        self.capabilities()
            .contains(SourceCapabilities::AUTHOR_LOOKUP)
    }

    /// Largest result count the provider returns in one call
    fn max_results(&self) -> usize;

    /// Clamp a requested result count into `1..=max_results()`
    fn clamp_results(&self, num_results: usize) -> usize {
        num_results.clamp(1, self.max_results().max(1))
    }

    /// Search the provider.
    ///
    /// Results keep the provider's order. Filters that do not apply to this
    /// provider are ignored.
    async fn search(
        &self,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError>;

    /// Look up an author profile
    async fn author_info(&self, _name: &str) -> Result<AuthorProfile, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Probe the provider with a minimal live query.
    ///
    /// Adapters that cache results must override this so the probe always
    /// reaches upstream.
    async fn health_check(&self) -> Result<(), SourceError> {
        self.search("test", 1, &SearchFilters::default())
            .await
            .map(|_| ())
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Credentials or settings for the provider are missing
    #[error("{0} is not configured")]
    NotConfigured(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with an error status
    #[error("{service} error: {message}")]
    ExternalService {
        service: String,
        message: String,
        status_code: Option<u16>,
    },

    /// The provider, the local gate or the daily quota refused the call
    #[error("{service} rate limit exceeded, retry after {retry_after}s")]
    RateLimit { service: String, retry_after: u64 },

    /// The call did not complete in time
    #[error("{service} request timed out after {}s", .timeout.as_secs_f64())]
    Timeout { service: String, timeout: Duration },

    /// The provider temporarily refused automated traffic (CAPTCHA)
    #[error("{service} temporarily blocked the request: {message}")]
    Blocked { service: String, message: String },

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// HTTP status reported by the provider, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SourceError::ExternalService { status_code, .. } => *status_code,
            SourceError::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Seconds the caller should wait before trying again
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            SourceError::RateLimit { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Whether a retry can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Timeout { .. } | SourceError::Network(_) | SourceError::Blocked { .. } => {
                true
            }
            SourceError::ExternalService { status_code, .. } => {
                status_code.map_or(false, |s| s >= 500)
            }
            _ => false,
        }
    }

    /// Stable label used for metrics and audit events
    pub fn error_type(&self) -> &'static str {
        match self {
            SourceError::NotImplemented => "not_implemented",
            SourceError::NotConfigured(_) => "not_configured",
            SourceError::InvalidRequest(_) => "validation_error",
            SourceError::ExternalService { .. } => "external_api_error",
            SourceError::RateLimit { .. } => "rate_limit_exceeded",
            SourceError::Timeout { .. } => "timeout",
            SourceError::Blocked { .. } => "blocked",
            SourceError::Network(_) => "network_error",
            SourceError::Parse(_) => "parse_error",
            SourceError::Other(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<ValidationError> for SourceError {
    fn from(err: ValidationError) -> Self {
        SourceError::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::SEARCH | SourceCapabilities::AUTHOR_LOOKUP;

        assert!(caps.contains(SourceCapabilities::SEARCH));
        assert!(caps.contains(SourceCapabilities::AUTHOR_LOOKUP));
        assert!(!caps.contains(SourceCapabilities::DAILY_QUOTA));
    }

    #[test]
    fn test_transient_classification() {
        let server = SourceError::ExternalService {
            service: "web".into(),
            message: "HTTP 503".into(),
            status_code: Some(503),
        };
        let client = SourceError::ExternalService {
            service: "web".into(),
            message: "HTTP 403".into(),
            status_code: Some(403),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(SourceError::Blocked {
            service: "academic".into(),
            message: "captcha".into()
        }
        .is_transient());
        assert!(!SourceError::Parse("bad json".into()).is_transient());
        assert!(!SourceError::InvalidRequest("empty".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Timeout {
            service: "video".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "video request timed out after 30s");

        let err = SourceError::RateLimit {
            service: "web".into(),
            retry_after: 60,
        };
        assert_eq!(err.retry_after(), Some(60));
        assert_eq!(err.status_code(), Some(429));
    }
}
