//! Search result model, a tagged union over the three provider kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::validate::{
    truncate_chars, validate_url, ValidationError, MAX_SNIPPET_CHARS, MAX_TITLE_CHARS, YEAR_RANGE,
};

/// The kind of provider a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Academic paper search (Google Scholar)
    Academic,
    /// General web search (Google Custom Search)
    Web,
    /// Video search (YouTube Data API)
    Video,
}

impl SourceKind {
    /// All kinds, in display order
    pub const ALL: [SourceKind; 3] = [SourceKind::Academic, SourceKind::Web, SourceKind::Video];

    /// Stable identifier, also used as the cache key prefix
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Academic => "academic",
            SourceKind::Web => "web",
            SourceKind::Video => "video",
        }
    }

    /// Human-readable provider name
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Academic => "Google Scholar",
            SourceKind::Web => "Google Web Search",
            SourceKind::Video => "YouTube",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "academic" | "scholar" | "google_scholar" => Ok(SourceKind::Academic),
            "web" | "google" | "google_web" => Ok(SourceKind::Web),
            "video" | "youtube" => Ok(SourceKind::Video),
            other => Err(format!(
                "Unknown source '{}'. Expected one of: academic, web, video",
                other
            )),
        }
    }
}

/// A paper returned by the academic provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub citations: u64,
    pub pdf_url: Option<String>,
    pub journal: Option<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl AcademicResult {
    /// Create a result with the required fields; everything else empty
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
            authors: Vec::new(),
            year: None,
            citations: 0,
            pdf_url: None,
            journal: None,
            retrieved_at: Utc::now(),
        }
    }
}

/// A page returned by the web provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub display_link: String,
    pub image_url: Option<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl WebResult {
    /// Create a result with the required fields; everything else empty
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
            display_link: String::new(),
            image_url: None,
            retrieved_at: Utc::now(),
        }
    }
}

/// A video returned by the video provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    pub video_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub channel_id: String,
    /// Formatted as `H:MM:SS` or `M:SS`
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl VideoResult {
    /// Create a result for `video_id` pointing at the canonical watch URL
    pub fn new(title: impl Into<String>, video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        Self {
            title: title.into(),
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            snippet: String::new(),
            video_id,
            channel_name: String::new(),
            channel_id: String::new(),
            duration: String::new(),
            view_count: 0,
            like_count: 0,
            published_at: None,
            thumbnail_url: None,
            retrieved_at: Utc::now(),
        }
    }
}

/// A single search result from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SearchResult {
    Academic(AcademicResult),
    Web(WebResult),
    Video(VideoResult),
}

impl SearchResult {
    /// The provider kind this result came from
    pub fn source(&self) -> SourceKind {
        match self {
            SearchResult::Academic(_) => SourceKind::Academic,
            SearchResult::Web(_) => SourceKind::Web,
            SearchResult::Video(_) => SourceKind::Video,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SearchResult::Academic(r) => &r.title,
            SearchResult::Web(r) => &r.title,
            SearchResult::Video(r) => &r.title,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            SearchResult::Academic(r) => &r.url,
            SearchResult::Web(r) => &r.url,
            SearchResult::Video(r) => &r.url,
        }
    }

    pub fn snippet(&self) -> &str {
        match self {
            SearchResult::Academic(r) => &r.snippet,
            SearchResult::Web(r) => &r.snippet,
            SearchResult::Video(r) => &r.snippet,
        }
    }

    pub fn retrieved_at(&self) -> DateTime<Utc> {
        match self {
            SearchResult::Academic(r) => r.retrieved_at,
            SearchResult::Web(r) => r.retrieved_at,
            SearchResult::Video(r) => r.retrieved_at,
        }
    }

    /// Normalise and validate the result.
    ///
    /// Title and snippet are trimmed and truncated to their limits. The main
    /// URL must be absolute http(s), otherwise the result is rejected. Optional
    /// URLs and out-of-range years that fail validation are dropped.
    pub fn validated(self) -> Result<Self, ValidationError> {
        match self {
            SearchResult::Academic(mut r) => {
                normalize_common(&mut r.title, &mut r.url, &mut r.snippet)?;
                r.pdf_url = r.pdf_url.and_then(|u| validate_url(&u).ok());
                r.year = r.year.filter(|y| YEAR_RANGE.contains(y));
                r.authors.retain(|a| !a.trim().is_empty());
                Ok(SearchResult::Academic(r))
            }
            SearchResult::Web(mut r) => {
                normalize_common(&mut r.title, &mut r.url, &mut r.snippet)?;
                r.image_url = r.image_url.and_then(|u| validate_url(&u).ok());
                Ok(SearchResult::Web(r))
            }
            SearchResult::Video(mut r) => {
                if r.video_id.trim().is_empty() {
                    return Err(ValidationError::MissingField("video_id"));
                }
                normalize_common(&mut r.title, &mut r.url, &mut r.snippet)?;
                r.thumbnail_url = r.thumbnail_url.and_then(|u| validate_url(&u).ok());
                Ok(SearchResult::Video(r))
            }
        }
    }
}

fn normalize_common(
    title: &mut String,
    url: &mut String,
    snippet: &mut String,
) -> Result<(), ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    *title = truncate_chars(trimmed, MAX_TITLE_CHARS);
    *url = validate_url(url)?;
    *snippet = truncate_chars(snippet.trim(), MAX_SNIPPET_CHARS);
    Ok(())
}
