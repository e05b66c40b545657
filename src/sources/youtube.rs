//! YouTube Data API v3 source.
//!
//! A search takes two calls: `search.list` for ids and snippets, then
//! `videos.list` for durations and statistics. Both count as one search
//! against the daily quota. When the second call fails the results are
//! still returned, just without duration and statistics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::{SearchFilters, SearchResult, SourceKind, VideoFilters, VideoResult};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError};

/// `maxResults` ceiling of `search.list`
const YOUTUBE_MAX_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    id: String,
    #[serde(default)]
    content_details: Option<ContentDetails>,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

/// The API reports counts as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

impl SearchItem {
    fn into_result(self) -> VideoResult {
        let snippet = self.snippet;
        let thumbnail_url = ["high", "medium", "default"]
            .iter()
            .find_map(|size| snippet.thumbnails.get(*size))
            .map(|t| t.url.clone());

        let mut result = VideoResult::new(snippet.title, self.id.video_id);
        result.snippet = snippet.description;
        result.channel_name = snippet.channel_title;
        result.channel_id = snippet.channel_id;
        result.published_at = snippet
            .published_at
            .and_then(|p| p.parse::<DateTime<Utc>>().ok());
        result.thumbnail_url = thumbnail_url;
        result
    }
}

impl VideoDetails {
    fn apply_to(&self, result: &mut VideoResult) {
        if let Some(details) = &self.content_details {
            result.duration = format_duration(&details.duration).unwrap_or_default();
        }
        if let Some(stats) = &self.statistics {
            let count = |c: &Option<String>| c.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0);
            result.view_count = count(&stats.view_count);
            result.like_count = count(&stats.like_count);
        }
    }
}

/// Turn an ISO 8601 duration (`PT1H2M3S`) into `H:MM:SS` or `M:SS`
fn format_duration(iso: &str) -> Option<String> {
    static ISO_DURATION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = ISO_DURATION
        .get_or_init(|| {
            Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").ok()
        })
        .as_ref()?;
    let caps = re.captures(iso)?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let hours = part(1).checked_mul(24)?.checked_add(part(2))?;
    let (minutes, seconds) = (part(3), part(4));
    Some(if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    })
}

fn parse_search_items(items: Vec<Value>) -> Vec<VideoResult> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<SearchItem>(item) {
            Ok(item) => Some(item.into_result()),
            Err(e) => {
                tracing::warn!("Skipping malformed video result #{}: {}", i, e);
                None
            }
        })
        .collect()
}

/// YouTube video search
#[derive(Debug, Clone)]
pub struct YouTubeSource {
    api_key: String,
    base_url: String,
    context: SourceContext,
    cache_ttl: Duration,
}

impl YouTubeSource {
    pub fn from_config(config: &Config, context: SourceContext) -> Result<Self, SourceError> {
        let Some(api_key) = &config.api_keys.youtube_api_key else {
            return Err(SourceError::NotConfigured(format!(
                "{} (YOUTUBE_API_KEY required)",
                SourceKind::Video.name()
            )));
        };

        Ok(Self {
            api_key: api_key.clone(),
            base_url: config.video.base_url.trim_end_matches('/').to_string(),
            context,
            cache_ttl: config.cache.ttl_for(SourceKind::Video),
        })
    }

    fn search_params(&self, query: &str, num_results: usize, video: &VideoFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", "video".to_string()),
            ("maxResults", num_results.to_string()),
            ("order", video.sort.api_value().to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(duration) = video.duration {
            params.push(("videoDuration", duration.api_value().to_string()));
        }
        if let Some(upload_date) = video.upload_date {
            let after = upload_date.published_after(Utc::now());
            params.push((
                "publishedAfter",
                after.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ));
        }
        params
    }

    async fn get_items(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.context.http.get(self.name(), &url, params).await?;
        let body: ItemList = response.json().await.map_err(|e| {
            SourceError::Parse(format!("Invalid {} {} response: {}", self.name(), endpoint, e))
        })?;
        Ok(body.items)
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<Vec<SearchResult>, SourceError> {
        let mut videos = parse_search_items(self.get_items("search", params).await?);
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let ids = videos
            .iter()
            .map(|v| v.video_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let details_params = [
            ("part", "contentDetails,statistics".to_string()),
            ("id", ids),
            ("key", self.api_key.clone()),
        ];
        match self.get_items("videos", &details_params).await {
            Ok(items) => {
                let details: HashMap<String, VideoDetails> = items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<VideoDetails>(item).ok())
                    .map(|d| (d.id.clone(), d))
                    .collect();
                for video in &mut videos {
                    if let Some(d) = details.get(&video.video_id) {
                        d.apply_to(video);
                    }
                }
            }
            Err(e) => tracing::warn!("Video details unavailable, returning basic results: {}", e),
        }

        Ok(videos
            .into_iter()
            .filter_map(|v| match SearchResult::Video(v).validated() {
                Ok(valid) => Some(valid),
                Err(e) => {
                    tracing::warn!("Skipping invalid video result: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl Source for YouTubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::DAILY_QUOTA
    }

    fn max_results(&self) -> usize {
        YOUTUBE_MAX_RESULTS
    }

    async fn search(
        &self,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let num_results = self.clamp_results(num_results);
        let video = &filters.video;
        let key = CacheStore::make_key(
            self.id(),
            &json!({
                "query": query,
                "num_results": num_results,
                "duration": video.duration,
                "upload_date": video.upload_date,
                "sort": video.sort,
            }),
        );

        let params = self.search_params(query, num_results, video);

        self.context
            .cached(self.kind(), &key, self.cache_ttl, || async {
                self.context
                    .call_upstream(self.kind(), self.context.retry, || self.fetch(&params))
                    .await
            })
            .await
    }

    /// Live one-result query that never touches the result cache
    async fn health_check(&self) -> Result<(), SourceError> {
        let params = self.search_params("test", 1, &VideoFilters::default());
        self.context
            .call_upstream(self.kind(), self.context.retry, || self.fetch(&params))
            .await
            .map(|_| ())
    }
}
