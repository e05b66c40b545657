//! Google Scholar academic source.
//!
//! Scholar has no public API, so results are scraped from the HTML result
//! page. Requests are serialised through a [`SerialGate`] with a minimum
//! spacing between calls, and pages that look like a CAPTCHA interstitial are
//! reported as [`SourceError::Blocked`] so the retry loop backs off.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::{AcademicResult, AuthorProfile, SearchFilters, SearchResult, SourceKind};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError};
use crate::utils::{strict_rate_limit_retry_config, HttpClient, RetryConfig, SerialGate};

/// Scholar serves at most 20 results per page
const SCHOLAR_MAX_RESULTS: usize = 20;

const SCHOLAR_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const CAPTCHA_MARKERS: &[&str] = &["gs_captcha", "unusual traffic", "recaptcha", "/sorry/"];

/// Google Scholar research source
#[derive(Debug, Clone)]
pub struct ScholarSource {
    base_url: String,
    http: HttpClient,
    gate: Arc<SerialGate>,
    retry: RetryConfig,
    context: SourceContext,
    search_ttl: Duration,
    author_ttl: Duration,
}

impl ScholarSource {
    pub fn from_config(config: &Config, context: SourceContext) -> Result<Self, SourceError> {
        let academic = &config.academic;
        if !academic.enabled {
            return Err(SourceError::NotConfigured(format!(
                "{} (disabled in configuration)",
                SourceKind::Academic.name()
            )));
        }

        let user_agent = config
            .http
            .user_agent
            .as_deref()
            .unwrap_or(SCHOLAR_USER_AGENT);
        let retry = RetryConfig {
            max_attempts: academic.max_attempts,
            blocked_delay: Duration::from_secs(academic.blocked_delay_secs),
            ..strict_rate_limit_retry_config()
        };

        Ok(Self {
            base_url: academic.base_url.trim_end_matches('/').to_string(),
            http: HttpClient::with_user_agent(user_agent, config.http.timeout()),
            gate: Arc::new(SerialGate::new(Duration::from_millis(
                academic.request_spacing_ms,
            ))),
            retry,
            context,
            search_ttl: config.cache.ttl_for(SourceKind::Academic),
            author_ttl: config.cache.author_ttl(),
        })
    }

    /// Replace the retry policy built from the academic settings
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch one page, one request at a time
    async fn fetch_page(&self, path: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let _permit = self.gate.acquire().await;
        let url = format!("{}{}", self.base_url, path);
        let service = self.name();

        let response = match self.http.get(service, &url, query).await {
            Ok(response) => response,
            // 4xx messages carry the start of the body
            Err(SourceError::ExternalService {
                status_code: Some(status),
                message,
                ..
            }) if (400..500).contains(&status) && looks_like_captcha(&message) => {
                tracing::warn!("{} answered HTTP {} with a CAPTCHA page", service, status);
                return Err(blocked(service));
            }
            Err(e) => return Err(e),
        };
        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to read {} page: {}", service, e)))?;

        if looks_like_captcha(&html) {
            tracing::warn!("{} returned a CAPTCHA page", service);
            return Err(blocked(service));
        }
        Ok(html)
    }

    fn search_params(query: &str, num_results: usize, filters: &SearchFilters) -> Vec<(&'static str, String)> {
        let academic = &filters.academic;
        let q = match academic.author.as_deref() {
            Some(author) if !author.trim().is_empty() => {
                format!("author:\"{}\" {}", author.trim(), query)
            }
            _ => query.to_string(),
        };

        let mut params = vec![
            ("q", q),
            ("hl", "en".to_string()),
            ("num", num_results.to_string()),
        ];
        if let Some(start) = academic.year_start {
            params.push(("as_ylo", start.to_string()));
        }
        if let Some(end) = academic.year_end {
            params.push(("as_yhi", end.to_string()));
        }
        params
    }
}

#[async_trait]
impl Source for ScholarSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Academic
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::AUTHOR_LOOKUP
    }

    fn max_results(&self) -> usize {
        SCHOLAR_MAX_RESULTS
    }

    async fn search(
        &self,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let num_results = self.clamp_results(num_results);
        let academic = &filters.academic;
        let key = CacheStore::make_key(
            self.id(),
            &json!({
                "query": query,
                "num_results": num_results,
                "author": academic.author,
                "year_start": academic.year_start,
                "year_end": academic.year_end,
            }),
        );
        let params = Self::search_params(query, num_results, filters);

        self.context
            .cached(self.kind(), &key, self.search_ttl, || async {
                let html = self
                    .context
                    .call_upstream(self.kind(), self.retry, || self.fetch_page("/scholar", &params))
                    .await?;
                let results = parse_results(&html, &self.base_url, num_results, filters)?;
                tracing::debug!("{} returned {} results", self.name(), results.len());
                Ok(results)
            })
            .await
    }

    /// Live one-result query that never touches the result cache
    async fn health_check(&self) -> Result<(), SourceError> {
        let params = Self::search_params("test", 1, &SearchFilters::default());
        self.context
            .call_upstream(self.kind(), self.retry, || self.fetch_page("/scholar", &params))
            .await
            .map(|_| ())
    }

    async fn author_info(&self, name: &str) -> Result<AuthorProfile, SourceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SourceError::InvalidRequest(
                "Author name must not be empty".to_string(),
            ));
        }

        let key = CacheStore::make_key(self.id(), &json!({ "author_profile": name }));
        let params = vec![
            ("view_op", "search_authors".to_string()),
            ("mauthors", name.to_string()),
            ("hl", "en".to_string()),
        ];

        self.context
            .cached(self.kind(), &key, self.author_ttl, || async {
                let html = self
                    .context
                    .call_upstream(self.kind(), self.retry, || {
                        self.fetch_page("/citations", &params)
                    })
                    .await?;
                parse_author(&html, &self.base_url)?.ok_or_else(|| SourceError::ExternalService {
                    service: self.name().to_string(),
                    message: format!("No author profile found for '{}'", name),
                    status_code: None,
                })
            })
            .await
    }
}

fn blocked(service: &str) -> SourceError {
    SourceError::Blocked {
        service: service.to_string(),
        message: "CAPTCHA challenge detected".to_string(),
    }
}

fn looks_like_captcha(html: &str) -> bool {
    let lower = html.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("Invalid selector '{}': {}", css, e)))
}

fn element_text(elem: &ElementRef) -> String {
    let text: String = elem.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(elem: &ElementRef, sel: &Selector) -> Option<String> {
    elem.select(sel)
        .next()
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
}

/// Resolve `href` against the Scholar base URL
fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

fn year_regex() -> Option<&'static Regex> {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").ok())
        .as_ref()
}

/// Strip `[PDF]`, `[CITATION]` and similar type tags from a title
fn strip_type_tags(title: &str) -> String {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match TAG.get_or_init(|| Regex::new(r"^(\[[A-Z]+\]\s*)+").ok()) {
        Some(re) => re.replace(title, "").into_owned(),
        None => title.to_string(),
    };
    stripped.trim().to_string()
}

fn leading_number(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Split a byline like `A Smith, B Jones - Nature, 2019 - nature.com`
fn parse_byline(byline: &str) -> (Vec<String>, Option<i32>, Option<String>) {
    let mut parts = byline.split(" - ");
    let authors = parts
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let venue = parts.next().unwrap_or_default().trim();
    let (year, journal) = match year_regex() {
        Some(re) => (
            re.find_iter(venue).last().and_then(|m| m.as_str().parse().ok()),
            re.replace_all(venue, "").into_owned(),
        ),
        None => (None, venue.to_string()),
    };
    let journal = journal.trim().trim_end_matches(',').trim().to_string();
    let journal = (!journal.is_empty()).then_some(journal);

    (authors, year, journal)
}

fn parse_results(
    html: &str,
    base_url: &str,
    num_results: usize,
    filters: &SearchFilters,
) -> Result<Vec<SearchResult>, SourceError> {
    let entry_sel = selector(".gs_r.gs_or.gs_scl")?;
    let title_sel = selector(".gs_rt")?;
    let link_sel = selector(".gs_rt a")?;
    let byline_sel = selector(".gs_a")?;
    let snippet_sel = selector(".gs_rs")?;
    let footer_sel = selector(".gs_fl a")?;
    let pdf_sel = selector(".gs_or_ggsm a")?;

    let document = Html::parse_document(html);
    let academic = &filters.academic;
    let mut results = Vec::new();

    for entry in document.select(&entry_sel) {
        let Some(raw_title) = first_text(&entry, &title_sel) else {
            tracing::debug!("Skipping Scholar entry without a title");
            continue;
        };
        let title = strip_type_tags(&raw_title);

        let url = entry
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| absolute_url(base_url, href))
            .unwrap_or_else(|| {
                format!("{}/scholar?q={}", base_url, urlencoding::encode(&title))
            });

        let (authors, year, journal) = first_text(&entry, &byline_sel)
            .map(|b| parse_byline(&b))
            .unwrap_or_default();

        if let (Some(start), Some(y)) = (academic.year_start, year) {
            if y < start {
                continue;
            }
        }
        if let (Some(end), Some(y)) = (academic.year_end, year) {
            if y > end {
                continue;
            }
        }

        let citations = entry
            .select(&footer_sel)
            .map(|a| element_text(&a))
            .find(|t| t.starts_with("Cited by"))
            .and_then(|t| leading_number(&t))
            .unwrap_or(0);

        let pdf_url = entry
            .select(&pdf_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| absolute_url(base_url, href));

        let mut result = AcademicResult::new(title, url);
        result.snippet = first_text(&entry, &snippet_sel).unwrap_or_default();
        result.authors = authors;
        result.year = year;
        result.citations = citations;
        result.pdf_url = pdf_url;
        result.journal = journal;

        match SearchResult::Academic(result).validated() {
            Ok(valid) => results.push(valid),
            Err(e) => tracing::debug!("Skipping malformed Scholar entry: {}", e),
        }
        if results.len() >= num_results {
            break;
        }
    }

    Ok(results)
}

fn parse_author(html: &str, base_url: &str) -> Result<Option<AuthorProfile>, SourceError> {
    let card_sel = selector(".gsc_1usr")?;
    let name_sel = selector(".gs_ai_name a")?;
    let aff_sel = selector(".gs_ai_aff")?;
    let email_sel = selector(".gs_ai_eml")?;
    let cited_sel = selector(".gs_ai_cby")?;
    let interest_sel = selector(".gs_ai_int a")?;

    let document = Html::parse_document(html);
    let Some(card) = document.select(&card_sel).next() else {
        return Ok(None);
    };
    let Some(name_link) = card.select(&name_sel).next() else {
        return Ok(None);
    };

    let url = name_link
        .value()
        .attr("href")
        .and_then(|href| absolute_url(base_url, href));
    let author_id = url.as_deref().and_then(|u| {
        Url::parse(u)
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == "user")
            .map(|(_, v)| v.into_owned())
    });
    let email_domain = first_text(&card, &email_sel).map(|e| {
        e.trim_start_matches("Verified email at ")
            .trim()
            .to_string()
    });

    Ok(Some(AuthorProfile {
        name: element_text(&name_link),
        author_id,
        affiliation: first_text(&card, &aff_sel),
        email_domain,
        interests: card
            .select(&interest_sel)
            .map(|i| element_text(&i))
            .filter(|i| !i.is_empty())
            .collect(),
        cited_by: first_text(&card, &cited_sel).and_then(|c| leading_number(&c)),
        h_index: None,
        i10_index: None,
        url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const RESULTS_PAGE: &str = r#"
<html><body><div id="gs_res_ccl_mid">
  <div class="gs_r gs_or gs_scl">
    <div class="gs_or_ggsm"><a href="https://arxiv.org/pdf/1234.pdf">[PDF] arxiv.org</a></div>
    <div class="gs_ri">
      <h3 class="gs_rt"><span class="gs_ctg2">[PDF]</span> <a href="https://example.org/deep">Deep learning</a></h3>
      <div class="gs_a">Y LeCun, Y Bengio, G Hinton - Nature, 2015 - nature.com</div>
      <div class="gs_rs">Deep learning allows computational models ...</div>
      <div class="gs_fl"><a href="/scholar?cites=1">Cited by 52,311</a><a href="/scholar?q=related">Related articles</a></div>
    </div>
  </div>
  <div class="gs_r gs_or gs_scl">
    <div class="gs_ri">
      <h3 class="gs_rt"><a href="/citations?view_op=view_citation&amp;id=2">Machine learning: a probabilistic perspective</a></h3>
      <div class="gs_a">KP Murphy - 2012 - books.google.com</div>
      <div class="gs_rs">Today's Web-enabled deluge of electronic data ...</div>
    </div>
  </div>
  <div class="gs_r gs_or gs_scl">
    <div class="gs_ri">
      <h3 class="gs_rt"><span class="gs_ctg2">[CITATION]</span> Pattern recognition and machine learning</h3>
      <div class="gs_a">CM Bishop, NM Nasrabadi - 2006</div>
      <div class="gs_fl"><a href="/scholar?cites=3">Cited by 70000</a></div>
    </div>
  </div>
  <div class="gs_r gs_or gs_scl"><div class="gs_ri"><div class="gs_a">No title here</div></div></div>
</div></body></html>
"#;

    const AUTHOR_PAGE: &str = r#"
<html><body>
  <div class="gsc_1usr">
    <h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user=JicYPdAAAAAJ">Geoffrey Hinton</a></h3>
    <div class="gs_ai_aff">Emeritus Prof. Computer Science, University of Toronto</div>
    <div class="gs_ai_eml">Verified email at cs.toronto.edu</div>
    <div class="gs_ai_cby">Cited by 850000</div>
    <div class="gs_ai_int"><a class="gs_ai_one_int">machine learning</a><a class="gs_ai_one_int">psychology</a></div>
  </div>
</body></html>
"#;

    fn test_source(base_url: &str) -> ScholarSource {
        let mut config = Config::default();
        config.academic.base_url = base_url.to_string();
        config.academic.request_spacing_ms = 0;
        config.academic.max_attempts = 1;
        ScholarSource::from_config(&config, SourceContext::standalone()).unwrap()
    }

    #[test]
    fn test_parse_results_page() {
        let results =
            parse_results(RESULTS_PAGE, "https://scholar.google.com", 20, &SearchFilters::default())
                .unwrap();
        assert_eq!(results.len(), 3);

        let SearchResult::Academic(first) = &results[0] else {
            panic!("expected academic result");
        };
        assert_eq!(first.title, "Deep learning");
        assert_eq!(first.url, "https://example.org/deep");
        assert_eq!(first.authors, vec!["Y LeCun", "Y Bengio", "G Hinton"]);
        assert_eq!(first.year, Some(2015));
        assert_eq!(first.journal.as_deref(), Some("Nature"));
        assert_eq!(first.citations, 52311);
        assert_eq!(first.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1234.pdf"));

        let SearchResult::Academic(second) = &results[1] else {
            panic!("expected academic result");
        };
        assert!(second.url.starts_with("https://scholar.google.com/citations"));
        assert_eq!(second.journal, None);
        assert_eq!(second.citations, 0);

        let SearchResult::Academic(third) = &results[2] else {
            panic!("expected academic result");
        };
        assert_eq!(third.title, "Pattern recognition and machine learning");
        assert!(third.url.contains("/scholar?q=Pattern"));
        assert_eq!(third.year, Some(2006));
    }

    #[test]
    fn test_parse_results_applies_year_filter_and_limit() {
        let mut filters = SearchFilters::default();
        filters.academic.year_start = Some(2010);
        let results = parse_results(RESULTS_PAGE, "https://scholar.google.com", 20, &filters).unwrap();
        assert_eq!(results.len(), 2);

        let limited =
            parse_results(RESULTS_PAGE, "https://scholar.google.com", 1, &SearchFilters::default())
                .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_parse_author_card() {
        let profile = parse_author(AUTHOR_PAGE, "https://scholar.google.com")
            .unwrap()
            .unwrap();
        assert_eq!(profile.name, "Geoffrey Hinton");
        assert_eq!(profile.author_id.as_deref(), Some("JicYPdAAAAAJ"));
        assert_eq!(profile.email_domain.as_deref(), Some("cs.toronto.edu"));
        assert_eq!(profile.cited_by, Some(850000));
        assert_eq!(profile.interests, vec!["machine learning", "psychology"]);
        assert!(parse_author("<html></html>", "https://scholar.google.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_captcha_detection() {
        assert!(looks_like_captcha("<div id=\"gs_captcha_ccl\"></div>"));
        assert!(looks_like_captcha("Our systems have detected Unusual Traffic"));
        assert!(!looks_like_captcha(RESULTS_PAGE));
    }

    #[test]
    fn test_search_params_with_filters() {
        let mut filters = SearchFilters::default();
        filters.academic.author = Some("Hinton".to_string());
        filters.academic.year_start = Some(2000);
        filters.academic.year_end = Some(2020);
        let params = ScholarSource::search_params("neural nets", 5, &filters);
        assert!(params.contains(&("q", "author:\"Hinton\" neural nets".to_string())));
        assert!(params.contains(&("num", "5".to_string())));
        assert!(params.contains(&("as_ylo", "2000".to_string())));
        assert!(params.contains(&("as_yhi", "2020".to_string())));
    }

    #[tokio::test]
    async fn test_search_scrapes_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "machine learning".into()),
                Matcher::UrlEncoded("num".into(), "20".into()),
            ]))
            .with_status(200)
            .with_body(RESULTS_PAGE)
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let first = source
            .search("machine learning", 100, &SearchFilters::default())
            .await
            .unwrap();
        let second = source
            .search("machine learning", 100, &SearchFilters::default())
            .await
            .unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_captcha_page_is_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/scholar")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html><form id=\"gs_captcha_f\"></form></html>")
            .create_async()
            .await;

        let source = test_source(&server.url());
        let err = source
            .search("anything", 5, &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_captcha_behind_client_error_is_blocked_and_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("<html>Our systems have detected unusual traffic <div id=\"gs_captcha_ccl\"></div></html>")
            .expect(2)
            .create_async()
            .await;

        let source = test_source(&server.url()).with_retry(RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            blocked_delay: Duration::from_millis(5),
        });
        let err = source
            .search("anything", 5, &SearchFilters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Blocked { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_plain_client_error_is_not_blocked() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("not found")
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let err = source
            .search("anything", 5, &SearchFilters::default())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_bypasses_cache() {
        let mut server = mockito::Server::new_async().await;
        let up = server
            .mock("GET", "/scholar")
            .match_query(Matcher::UrlEncoded("num".into(), "1".into()))
            .with_status(200)
            .with_body(RESULTS_PAGE)
            .expect(1)
            .create_async()
            .await;

        let source = test_source(&server.url());
        assert!(source.health_check().await.is_ok());
        up.assert_async().await;
        up.remove_async().await;

        let _down = server
            .mock("GET", "/scholar")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let err = source.health_check().await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn test_author_lookup() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/citations")
            .match_query(Matcher::UrlEncoded("mauthors".into(), "Geoffrey Hinton".into()))
            .with_status(200)
            .with_body(AUTHOR_PAGE)
            .create_async()
            .await;

        let source = test_source(&server.url());
        let profile = source.author_info("Geoffrey Hinton").await.unwrap();
        assert_eq!(profile.name, "Geoffrey Hinton");
        assert!(profile.url.unwrap().starts_with(&server.url()));

        assert!(matches!(
            source.author_info("  ").await,
            Err(SourceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_disabled_source_is_not_configured() {
        let mut config = Config::default();
        config.academic.enabled = false;
        assert!(matches!(
            ScholarSource::from_config(&config, SourceContext::standalone()),
            Err(SourceError::NotConfigured(_))
        ));
    }
}
