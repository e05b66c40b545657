//! Tool handlers backed by [`UnifiedSearch`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::tools::{ToolError, ToolHandler};
use crate::models::{
    SafeSearch, SearchFilters, SearchRequest, SourceKind, UploadDate, VideoDuration, VideoSort,
    DEFAULT_NUM_RESULTS,
};
use crate::orchestrator::{UnifiedSearch, UnifiedSearchError};
use crate::sources::SourceError;

/// Flat filter arguments shared by the search tools
#[derive(Debug, Default, Deserialize)]
struct FilterArgs {
    author: Option<String>,
    year_start: Option<i32>,
    year_end: Option<i32>,
    language: Option<String>,
    safe_search: Option<SafeSearch>,
    duration: Option<VideoDuration>,
    upload_date: Option<UploadDate>,
    sort: Option<VideoSort>,
}

impl FilterArgs {
    fn into_filters(self) -> SearchFilters {
        let mut filters = SearchFilters::default();
        filters.academic.author = self.author;
        filters.academic.year_start = self.year_start;
        filters.academic.year_end = self.year_end;
        if let Some(language) = self.language {
            filters.web.language = language;
        }
        if let Some(safe_search) = self.safe_search {
            filters.web.safe_search = safe_search;
        }
        filters.video.duration = self.duration;
        filters.video.upload_date = self.upload_date;
        if let Some(sort) = self.sort {
            filters.video.sort = sort;
        }
        filters
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default = "default_num_results")]
    num_results: usize,
    #[serde(flatten)]
    filters: FilterArgs,
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    // Clients may send no arguments at all for parameterless tools
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(e.to_string()))
}

fn source_error(err: SourceError) -> ToolError {
    match err {
        SourceError::InvalidRequest(message) => ToolError::InvalidParams(message),
        other => ToolError::Internal(other.to_string()),
    }
}

/// Handler for `unified_search`
#[derive(Debug)]
pub struct UnifiedSearchHandler {
    pub search: Arc<UnifiedSearch>,
}

#[async_trait]
impl ToolHandler for UnifiedSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let sources = args
            .sources
            .iter()
            .map(|s| s.parse::<SourceKind>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ToolError::InvalidParams)?;

        let request = SearchRequest::new(args.query)
            .sources(sources)
            .num_results(args.num_results)
            .filters(args.filters.into_filters());

        let response = self.search.search(request).await.map_err(|e| match e {
            UnifiedSearchError::Validation(err) => ToolError::InvalidParams(err.to_string()),
            UnifiedSearchError::NoAdapters => ToolError::Internal(e.to_string()),
        })?;
        to_json(&response)
    }
}

/// Handler for `search_academic`, `search_web` and `search_video`
#[derive(Debug)]
pub struct SourceSearchHandler {
    pub search: Arc<UnifiedSearch>,
    pub kind: SourceKind,
}

#[async_trait]
impl ToolHandler for SourceSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let filters = args.filters.into_filters();

        let results = self
            .search
            .search_source(self.kind, &args.query, args.num_results, &filters)
            .await
            .map_err(source_error)?;

        Ok(json!({
            "source": self.kind,
            "query": args.query.trim(),
            "total_results": results.len(),
            "results": to_json(&results)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct AuthorArgs {
    author_name: String,
}

/// Handler for `get_author_info`
#[derive(Debug)]
pub struct AuthorInfoHandler {
    pub search: Arc<UnifiedSearch>,
}

#[async_trait]
impl ToolHandler for AuthorInfoHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: AuthorArgs = parse_args(args)?;
        let profile = self
            .search
            .author_info(&args.author_name)
            .await
            .map_err(source_error)?;
        to_json(&profile)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClearCacheArgs {
    source: Option<String>,
}

/// Handler for `clear_cache`
#[derive(Debug)]
pub struct ClearCacheHandler {
    pub search: Arc<UnifiedSearch>,
}

#[async_trait]
impl ToolHandler for ClearCacheHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ClearCacheArgs = parse_args(args)?;
        let source = args
            .source
            .as_deref()
            .map(str::parse::<SourceKind>)
            .transpose()
            .map_err(ToolError::InvalidParams)?;

        let cleared = self.search.clear_cache(source).await;
        Ok(json!({
            "cleared": cleared,
            "source": source.map_or("all", |k| k.id()),
        }))
    }
}

/// Handler for `get_api_usage_stats`
#[derive(Debug)]
pub struct UsageStatsHandler {
    pub search: Arc<UnifiedSearch>,
}

#[async_trait]
impl ToolHandler for UsageStatsHandler {
    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        to_json(&self.search.get_api_usage_stats().await)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusArgs {
    #[serde(default)]
    probe: bool,
}

/// Handler for `get_service_status`
#[derive(Debug)]
pub struct ServiceStatusHandler {
    pub search: Arc<UnifiedSearch>,
}

#[async_trait]
impl ToolHandler for ServiceStatusHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: StatusArgs = parse_args(args)?;
        to_json(&self.search.get_service_status(args.probe).await)
    }
}
