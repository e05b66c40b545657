//! Utility modules shared by the adapters and the orchestrator.
//!
//! - [`HttpClient`]: lazily built pooled HTTP client with status classification
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff for transient errors
//! - [`RateGate`]: per-resource sliding-window throttle
//! - [`SerialGate`]: single-flight gate with a minimum spacing between calls
//! - [`validate`]: input validation and text truncation helpers
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use unified_search::sources::SourceError;
//! use unified_search::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let data = with_retry(RetryConfig::default(), || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod rate_limit;
mod retry;
pub mod validate;

pub use http::{classify_response, parse_retry_after, HttpClient, DEFAULT_RETRY_AFTER_SECS};
pub use rate_limit::{RateDecision, RateGate, SerialGate, SerialPermit};
pub use retry::{
    api_retry_config, strict_rate_limit_retry_config, with_retry, RetryConfig, TransientError,
};
