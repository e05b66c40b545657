//! Google Custom Search JSON API source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::{SearchFilters, SearchResult, SourceKind, WebFilters, WebResult};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError};

/// The Custom Search API returns at most 10 items per call
const CSE_MAX_RESULTS: usize = 10;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
    #[serde(default)]
    pagemap: Option<CsePagemap>,
}

#[derive(Debug, Deserialize)]
struct CsePagemap {
    #[serde(default)]
    cse_image: Vec<CseImage>,
}

#[derive(Debug, Deserialize)]
struct CseImage {
    src: Option<String>,
}

impl CseItem {
    fn into_result(self) -> WebResult {
        let image_url = self
            .pagemap
            .and_then(|p| p.cse_image.into_iter().next())
            .and_then(|img| img.src);

        let mut result = WebResult::new(self.title, self.link);
        result.snippet = self.snippet;
        result.display_link = self.display_link;
        result.image_url = image_url;
        result
    }
}

/// Google web search through the Custom Search JSON API
#[derive(Debug, Clone)]
pub struct WebSearchSource {
    api_key: String,
    engine_id: String,
    base_url: String,
    context: SourceContext,
    cache_ttl: Duration,
}

impl WebSearchSource {
    /// Requires both the API key and the search engine id
    pub fn from_config(config: &Config, context: SourceContext) -> Result<Self, SourceError> {
        let keys = &config.api_keys;
        let (Some(api_key), Some(engine_id)) = (&keys.google_api_key, &keys.google_cse_id) else {
            return Err(SourceError::NotConfigured(format!(
                "{} (GOOGLE_API_KEY and GOOGLE_CSE_ID required)",
                SourceKind::Web.name()
            )));
        };

        Ok(Self {
            api_key: api_key.clone(),
            engine_id: engine_id.clone(),
            base_url: config.web.base_url.clone(),
            context,
            cache_ttl: config.cache.ttl_for(SourceKind::Web),
        })
    }

    /// Override the result cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn search_params(&self, query: &str, num_results: usize, web: &WebFilters) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.to_string()),
            ("num", num_results.to_string()),
            ("lr", format!("lang_{}", web.language)),
            ("safe", web.safe_search.api_value().to_string()),
        ]
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<Vec<SearchResult>, SourceError> {
        let response = self
            .context
            .http
            .get(self.name(), &self.base_url, params)
            .await?;
        let body: CseResponse = response.json().await.map_err(|e| {
            SourceError::Parse(format!("Invalid {} response: {}", self.name(), e))
        })?;
        Ok(parse_items(body.items))
    }
}

fn parse_items(items: Vec<Value>) -> Vec<SearchResult> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let parsed = serde_json::from_value::<CseItem>(item)
                .map_err(SourceError::from)
                .and_then(|item| {
                    SearchResult::Web(item.into_result())
                        .validated()
                        .map_err(SourceError::from)
                });
            match parsed {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!("Skipping malformed web result #{}: {}", i, e);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl Source for WebSearchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::DAILY_QUOTA
    }

    fn max_results(&self) -> usize {
        CSE_MAX_RESULTS
    }

    async fn search(
        &self,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let num_results = self.clamp_results(num_results);
        let web = &filters.web;
        let key = CacheStore::make_key(
            self.id(),
            &json!({
                "query": query,
                "num_results": num_results,
                "language": web.language,
                "safe_search": web.safe_search,
            }),
        );
        let params = self.search_params(query, num_results, web);

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
        let filters = SearchFilters::default();
        let params = self.search_params("test", 1, &filters.web);
        self.context
            .call_upstream(self.kind(), self.context.retry, || self.fetch(&params))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeys;
    use crate::utils::RetryConfig;
    use mockito::Matcher;

    const CSE_BODY: &str = r#"{
        "kind": "customsearch#search",
        "items": [
            {
                "title": "Rust Programming Language",
                "link": "https://www.rust-lang.org/",
                "snippet": "A language empowering everyone.",
                "displayLink": "www.rust-lang.org",
                "pagemap": {"cse_image": [{"src": "https://www.rust-lang.org/logo.png"}]}
            },
            {
                "title": "The Rust Book",
                "link": "https://doc.rust-lang.org/book/",
                "displayLink": "doc.rust-lang.org"
            },
            {
                "title": "Broken item without a link"
            }
        ]
    }"#;

    fn test_source(base_url: &str) -> WebSearchSource {
        let config = Config {
            api_keys: ApiKeys {
                google_api_key: Some("test-key".to_string()),
                google_cse_id: Some("test-cx".to_string()),
                youtube_api_key: None,
            },
            web: crate::config::WebConfig {
                base_url: base_url.to_string(),
            },
            ..Config::default()
        };
        let context = SourceContext::standalone().with_retry(RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            blocked_delay: Duration::from_millis(1),
        });
        WebSearchSource::from_config(&config, context).unwrap()
    }

    #[test]
    fn test_parse_items_skips_malformed() {
        let body: CseResponse = serde_json::from_str(CSE_BODY).unwrap();
        let results = parse_items(body.items);
        assert_eq!(results.len(), 2);

        let SearchResult::Web(first) = &results[0] else {
            panic!("expected web result");
        };
        assert_eq!(first.display_link, "www.rust-lang.org");
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://www.rust-lang.org/logo.png")
        );
        assert_eq!(results[1].snippet(), "");
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config {
            api_keys: ApiKeys {
                google_api_key: Some("key".to_string()),
                google_cse_id: None,
                youtube_api_key: None,
            },
            ..Config::default()
        };
        let err = WebSearchSource::from_config(&config, SourceContext::standalone()).unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_search_clamps_and_maps_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("cx".into(), "test-cx".into()),
                Matcher::UrlEncoded("q".into(), "rust".into()),
                Matcher::UrlEncoded("num".into(), "10".into()),
                Matcher::UrlEncoded("lr".into(), "lang_de".into()),
                Matcher::UrlEncoded("safe".into(), "off".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CSE_BODY)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let mut filters = SearchFilters::default();
        filters.web.language = "de".to_string();
        filters.web.safe_search = crate::models::SafeSearch::Off;

        let results = source.search("rust", 25, &filters).await.unwrap();
        assert_eq!(results.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_search_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(CSE_BODY)
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let filters = SearchFilters::default();
        let first = source.search("rust", 5, &filters).await.unwrap();
        let second = source.search("rust", 5, &filters).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_entry_calls_upstream_again() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(CSE_BODY)
            .expect(2)
            .create_async()
            .await;

        let source = test_source(&server.url()).with_cache_ttl(Duration::from_millis(50));
        let filters = SearchFilters::default();
        source.search("rust", 5, &filters).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        source.search("rust", 5, &filters).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_always_reaches_upstream() {
        let mut server = mockito::Server::new_async().await;
        let healthy = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("num".into(), "1".into()))
            .with_status(200)
            .with_body(CSE_BODY)
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        source.health_check().await.unwrap();
        healthy.assert_async().await;
        healthy.remove_async().await;

        let revoked = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("API key revoked")
            .expect(1)
            .create_async()
            .await;

        let err = source.health_check().await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        revoked.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried_past_max_delay() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "120")
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let err = source
            .search("rust", 5, &SearchFilters::default())
            .await
            .unwrap_err();

        assert_eq!(err.retry_after(), Some(120));
        assert_eq!(err.status_code(), Some(429));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let err = source
            .search("rust", 5, &SearchFilters::default())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_transient());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("{\"error\": \"quota\"}")
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let err = source
            .search("rust", 5, &SearchFilters::default())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(403));
        assert!(err.to_string().contains("quota"));
        mock.assert_async().await;
    }
}
