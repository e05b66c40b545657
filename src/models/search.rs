//! Search request and response models.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::result::{SearchResult, SourceKind};
use crate::utils::validate::{
    validate_num_results, validate_query, validate_year_range, ValidationError, MAX_AUTHOR_CHARS,
};

/// Default number of results per source
pub const DEFAULT_NUM_RESULTS: usize = 10;

/// Safe-search level for web results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    High,
    #[default]
    Medium,
    Off,
}

impl SafeSearch {
    /// Value understood by the Custom Search API `safe` parameter
    pub fn api_value(&self) -> &'static str {
        match self {
            SafeSearch::High | SafeSearch::Medium => "active",
            SafeSearch::Off => "off",
        }
    }
}

/// Video length bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoDuration {
    /// Under 4 minutes
    Short,
    /// 4 to 20 minutes
    Medium,
    /// Over 20 minutes
    Long,
}

impl VideoDuration {
    pub fn api_value(&self) -> &'static str {
        match self {
            VideoDuration::Short => "short",
            VideoDuration::Medium => "medium",
            VideoDuration::Long => "long",
        }
    }
}

/// Maximum upload age for videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadDate {
    Hour,
    Today,
    Week,
    Month,
    Year,
}

impl UploadDate {
    /// Earliest accepted publish time relative to `now`
    pub fn published_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let age = match self {
            UploadDate::Hour => ChronoDuration::hours(1),
            UploadDate::Today => ChronoDuration::days(1),
            UploadDate::Week => ChronoDuration::days(7),
            UploadDate::Month => ChronoDuration::days(30),
            UploadDate::Year => ChronoDuration::days(365),
        };
        now - age
    }
}

/// Sort order for video results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSort {
    #[default]
    Relevance,
    Date,
    Rating,
    ViewCount,
}

impl VideoSort {
    pub fn api_value(&self) -> &'static str {
        match self {
            VideoSort::Relevance => "relevance",
            VideoSort::Date => "date",
            VideoSort::Rating => "rating",
            VideoSort::ViewCount => "viewCount",
        }
    }
}

/// Filters understood by the academic provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicFilters {
    pub author: Option<String>,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
}

/// Filters understood by the web provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebFilters {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub safe_search: SafeSearch,
}

impl Default for WebFilters {
    fn default() -> Self {
        Self {
            language: default_language(),
            safe_search: SafeSearch::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// Filters understood by the video provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoFilters {
    pub duration: Option<VideoDuration>,
    pub upload_date: Option<UploadDate>,
    #[serde(default)]
    pub sort: VideoSort,
}

/// Per-source filter bag. Each provider reads its own section and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub academic: AcademicFilters,
    #[serde(default)]
    pub web: WebFilters,
    #[serde(default)]
    pub video: VideoFilters,
}

impl SearchFilters {
    /// Validate filter values
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(author) = &self.academic.author {
            if author.chars().count() > MAX_AUTHOR_CHARS {
                return Err(ValidationError::InvalidField {
                    field: "author",
                    reason: format!("exceeds {} characters", MAX_AUTHOR_CHARS),
                });
            }
        }
        validate_year_range(self.academic.year_start, self.academic.year_end)?;

        let lang = &self.web.language;
        if !(2..=5).contains(&lang.len()) || !lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
        {
            return Err(ValidationError::InvalidField {
                field: "language",
                reason: format!("'{}' is not a 2-5 character language code", lang),
            });
        }
        Ok(())
    }
}

/// A unified search request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search query string
    pub query: String,

    /// Sources to query; empty means every configured source
    #[serde(default)]
    pub sources: Vec<SourceKind>,

    /// Number of results requested from each source
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    /// Per-source filters
    #[serde(default)]
    pub filters: SearchFilters,
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

impl SearchRequest {
    /// Create a new request for all configured sources
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: Vec::new(),
            num_results: DEFAULT_NUM_RESULTS,
            filters: SearchFilters::default(),
        }
    }

    /// Restrict the request to the given sources
    pub fn sources(mut self, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Set the number of results per source
    pub fn num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results;
        self
    }

    /// Set the academic author filter
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.filters.academic.author = Some(author.into());
        self
    }

    /// Set the academic year range
    pub fn years(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.filters.academic.year_start = start;
        self.filters.academic.year_end = end;
        self
    }

    /// Replace the whole filter bag
    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Validate the request and return its normalised form.
    ///
    /// The query is trimmed and the source list is sorted and deduplicated, so
    /// equivalent requests share one composite cache key.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.query = validate_query(&self.query)?;
        validate_num_results(self.num_results)?;
        self.filters.validate()?;
        if let Some(author) = self.filters.academic.author.take() {
            let author = author.trim().to_string();
            self.filters.academic.author = (!author.is_empty()).then_some(author);
        }
        self.sources.sort();
        self.sources.dedup();
        Ok(self)
    }
}

/// Metadata about how a response was produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Sources the caller asked for (after defaulting)
    #[serde(default)]
    pub requested_sources: Vec<SourceKind>,
    /// Sources that returned results
    #[serde(default)]
    pub successful_sources: Vec<SourceKind>,
    /// Requested sources with no configured adapter
    #[serde(default)]
    pub unavailable_sources: Vec<SourceKind>,
    /// Whether this response was served from the composite cache
    #[serde(default)]
    pub cache_hit: bool,
    /// Wall time spent on each source in milliseconds
    #[serde(default)]
    pub source_times_ms: BTreeMap<SourceKind, u64>,
}

/// Aggregated response of a unified search.
///
/// A source has either a result list or an error, never both, and
/// `total_results` always equals the sum of the result list lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SearchResponseRepr")]
pub struct SearchResponse {
    query: String,
    results: BTreeMap<SourceKind, Vec<SearchResult>>,
    total_results: usize,
    errors: BTreeMap<SourceKind, String>,
    search_time_ms: u64,
    metadata: ResponseMetadata,
}

/// Wire shape; `total_results` is ignored and recomputed.
#[derive(Deserialize)]
struct SearchResponseRepr {
    query: String,
    #[serde(default)]
    results: BTreeMap<SourceKind, Vec<SearchResult>>,
    #[serde(default)]
    errors: BTreeMap<SourceKind, String>,
    #[serde(default)]
    search_time_ms: u64,
    #[serde(default)]
    metadata: ResponseMetadata,
}

impl From<SearchResponseRepr> for SearchResponse {
    fn from(repr: SearchResponseRepr) -> Self {
        let mut response = SearchResponse {
            query: repr.query,
            results: BTreeMap::new(),
            total_results: 0,
            errors: BTreeMap::new(),
            search_time_ms: repr.search_time_ms,
            metadata: repr.metadata,
        };
        for (kind, results) in repr.results {
            response.set_results(kind, results);
        }
        for (kind, error) in repr.errors {
            response.set_error(kind, error);
        }
        response
    }
}

impl SearchResponse {
    /// Create an empty response for `query`
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: BTreeMap::new(),
            total_results: 0,
            errors: BTreeMap::new(),
            search_time_ms: 0,
            metadata: ResponseMetadata::default(),
        }
    }

    /// Record the results of one source, clearing any error for it
    pub fn set_results(&mut self, kind: SourceKind, results: Vec<SearchResult>) {
        self.errors.remove(&kind);
        self.results.insert(kind, results);
        self.recompute_total();
    }

    /// Record the failure of one source, clearing any results for it
    pub fn set_error(&mut self, kind: SourceKind, error: impl Into<String>) {
        self.results.remove(&kind);
        self.errors.insert(kind, error.into());
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        self.total_results = self.results.values().map(Vec::len).sum();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &BTreeMap<SourceKind, Vec<SearchResult>> {
        &self.results
    }

    /// Results of one source, if it succeeded
    pub fn results_for(&self, kind: SourceKind) -> Option<&[SearchResult]> {
        self.results.get(&kind).map(Vec::as_slice)
    }

    pub fn errors(&self) -> &BTreeMap<SourceKind, String> {
        &self.errors
    }

    pub fn total_results(&self) -> usize {
        self.total_results
    }

    pub fn search_time(&self) -> Duration {
        Duration::from_millis(self.search_time_ms)
    }

    pub fn set_search_time(&mut self, elapsed: Duration) {
        self.search_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ResponseMetadata {
        &mut self.metadata
    }

    /// True when no requested source failed
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::WebResult;

    fn web(title: &str) -> SearchResult {
        SearchResult::Web(WebResult::new(title, "https://example.com"))
    }

    #[test]
    fn test_request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "rust"}"#).unwrap();
        assert_eq!(request.num_results, DEFAULT_NUM_RESULTS);
        assert!(request.sources.is_empty());
        assert_eq!(request.filters.web.language, "en");
        assert_eq!(request.filters.web.safe_search, SafeSearch::Medium);
        assert_eq!(request.filters.video.sort, VideoSort::Relevance);
    }

    #[test]
    fn test_request_validation() {
        assert!(SearchRequest::new("rust").validated().is_ok());
        assert!(SearchRequest::new("  ").validated().is_err());
        assert!(SearchRequest::new("rust").num_results(0).validated().is_err());
        assert!(SearchRequest::new("rust").num_results(51).validated().is_err());
        assert!(SearchRequest::new("rust")
            .years(Some(2021), Some(2019))
            .validated()
            .is_err());
        assert!(SearchRequest::new("rust")
            .author("a".repeat(201))
            .validated()
            .is_err());

        let mut bad_lang = SearchRequest::new("rust");
        bad_lang.filters.web.language = "english-uk".to_string();
        assert!(bad_lang.validated().is_err());
    }

    #[test]
    fn test_request_normalisation() {
        let request = SearchRequest::new("  rust  ")
            .sources([SourceKind::Video, SourceKind::Academic, SourceKind::Video])
            .validated()
            .unwrap();
        assert_eq!(request.query, "rust");
        assert_eq!(request.sources, vec![SourceKind::Academic, SourceKind::Video]);
    }

    #[test]
    fn test_upload_date_published_after() {
        let now = Utc::now();
        assert_eq!(
            UploadDate::Week.published_after(now),
            now - ChronoDuration::days(7)
        );
    }

    #[test]
    fn test_response_total_is_recomputed() {
        let mut response = SearchResponse::new("rust");
        response.set_results(SourceKind::Web, vec![web("a"), web("b")]);
        response.set_results(SourceKind::Academic, vec![web("c")]);
        assert_eq!(response.total_results(), 3);

        response.set_error(SourceKind::Web, "boom");
        assert_eq!(response.total_results(), 1);
        assert!(response.results_for(SourceKind::Web).is_none());
        assert_eq!(response.errors().get(&SourceKind::Web).unwrap(), "boom");
    }

    #[test]
    fn test_response_results_and_errors_are_exclusive() {
        let mut response = SearchResponse::new("rust");
        response.set_error(SourceKind::Video, "quota");
        response.set_results(SourceKind::Video, vec![web("a")]);
        assert!(response.errors().is_empty());
        assert!(response.is_complete());
    }

    #[test]
    fn test_response_deserialization_ignores_total() {
        let mut response = SearchResponse::new("rust");
        response.set_results(SourceKind::Web, vec![web("a")]);
        let mut json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_results"], 1);

        json["total_results"] = serde_json::json!(99);
        let back: SearchResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_results(), 1);
        assert_eq!(back, response);
    }
}
