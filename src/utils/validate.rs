//! Input validation for search requests and parsed results.
//!
//! Requests are rejected with a [`ValidationError`] before any upstream call is
//! made. Result fields are normalised (truncated) where possible and rejected
//! only when they cannot be repaired, e.g. a relative or non-http URL.

use thiserror::Error;

/// Maximum query length in characters
pub const MAX_QUERY_CHARS: usize = 500;
/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 500;
/// Maximum snippet length in characters
pub const MAX_SNIPPET_CHARS: usize = 2000;
/// Maximum author filter length in characters
pub const MAX_AUTHOR_CHARS: usize = 200;
/// Inclusive range accepted for publication years
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;
/// Inclusive range accepted for per-source result counts
pub const NUM_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=50;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Query exceeds {max} characters")]
    QueryTooLong { max: usize },

    #[error("num_results must be between {min} and {max}, got {got}")]
    NumResultsOutOfRange { min: usize, max: usize, got: usize },

    #[error("Invalid year {0}: expected a value between 1900 and 2100")]
    YearOutOfRange(i32),

    #[error("year_end ({end}) must be greater than or equal to year_start ({start})")]
    InvertedYearRange { start: i32, end: i32 },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Validate and trim a search query
pub fn validate_query(query: &str) -> Result<String, ValidationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(ValidationError::QueryTooLong {
            max: MAX_QUERY_CHARS,
        });
    }
    Ok(query.to_string())
}

/// Validate a per-source result count
pub fn validate_num_results(num_results: usize) -> Result<usize, ValidationError> {
    if NUM_RESULTS_RANGE.contains(&num_results) {
        Ok(num_results)
    } else {
        Err(ValidationError::NumResultsOutOfRange {
            min: *NUM_RESULTS_RANGE.start(),
            max: *NUM_RESULTS_RANGE.end(),
            got: num_results,
        })
    }
}

/// Validate an optional year bound
pub fn validate_year(year: Option<i32>) -> Result<(), ValidationError> {
    match year {
        Some(y) if !YEAR_RANGE.contains(&y) => Err(ValidationError::YearOutOfRange(y)),
        _ => Ok(()),
    }
}

/// Validate a year range, both ends optional
pub fn validate_year_range(start: Option<i32>, end: Option<i32>) -> Result<(), ValidationError> {
    validate_year(start)?;
    validate_year(end)?;
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvertedYearRange { start, end });
        }
    }
    Ok(())
}

/// Validate a URL: must be absolute with an http or https scheme
///
/// Returns the trimmed URL on success.
pub fn validate_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(ValidationError::InvalidUrl(
            "contains control characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                other
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.to_string())
}

/// Truncate `text` to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  rust  ").unwrap(), "rust");
        assert_eq!(validate_query("   "), Err(ValidationError::EmptyQuery));

        let long = "a".repeat(MAX_QUERY_CHARS + 1);
        assert!(matches!(
            validate_query(&long),
            Err(ValidationError::QueryTooLong { .. })
        ));
        assert!(validate_query(&"a".repeat(MAX_QUERY_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_num_results() {
        assert!(validate_num_results(1).is_ok());
        assert!(validate_num_results(50).is_ok());
        assert!(validate_num_results(0).is_err());
        assert!(validate_num_results(51).is_err());
    }

    #[test]
    fn test_validate_year_range() {
        assert!(validate_year_range(None, None).is_ok());
        assert!(validate_year_range(Some(2018), Some(2020)).is_ok());
        assert!(validate_year_range(Some(2020), Some(2020)).is_ok());
        assert_eq!(
            validate_year_range(Some(2021), Some(2020)),
            Err(ValidationError::InvertedYearRange {
                start: 2021,
                end: 2020
            })
        );
        assert_eq!(
            validate_year_range(Some(1800), None),
            Err(ValidationError::YearOutOfRange(1800))
        );
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/paper").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("/relative/path").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
