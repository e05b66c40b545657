//! Structured audit events.
//!
//! Emitted on the `audit` tracing target so they can be routed separately,
//! e.g. `RUST_LOG=audit=info`.

use std::time::Duration;

use crate::models::SourceKind;
use crate::utils::validate::truncate_chars;

/// Longest query prefix written to the audit log
const AUDIT_QUERY_CHARS: usize = 100;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A unified search finished
pub fn search_performed(
    query: &str,
    sources: &[SourceKind],
    total_results: usize,
    elapsed: Duration,
    cache_hit: bool,
) {
    let sources = sources
        .iter()
        .map(|s| s.id())
        .collect::<Vec<_>>()
        .join(",");
    tracing::info!(
        target: "audit",
        event = "search_performed",
        query = %truncate_chars(query, AUDIT_QUERY_CHARS),
        sources = %sources,
        total_results,
        duration_ms = millis(elapsed),
        cache_hit,
    );
}

/// An upstream API call finished
pub fn api_call(api: &str, success: bool, elapsed: Duration, status_code: Option<u16>) {
    tracing::info!(
        target: "audit",
        event = "api_call",
        api,
        success,
        duration_ms = millis(elapsed),
        status_code = status_code.unwrap_or(0),
    );
}

/// An error was reported to a caller
pub fn error_occurred(error_type: &str, source: &str, message: &str) {
    tracing::warn!(
        target: "audit",
        event = "error_occurred",
        error_type,
        source,
        error_message = message,
    );
}
