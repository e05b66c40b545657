//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{
    AcademicResult, AuthorProfile, SearchFilters, SearchResult, SourceKind, VideoResult, WebResult,
};
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source for testing that returns predefined responses.
#[derive(Debug)]
pub struct MockSource {
    kind: SourceKind,
    results: Mutex<Vec<SearchResult>>,
    error: Mutex<Option<SourceError>>,
    delay: Duration,
    panic_on_search: bool,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock that returns no results
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            results: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            delay: Duration::ZERO,
            panic_on_search: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `results` from every search
    pub fn with_results(self, results: Vec<SearchResult>) -> Self {
        self.set_results(results);
        self
    }

    /// Fail every search with `error`
    pub fn with_error(self, error: SourceError) -> Self {
        self.set_error(Some(error));
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic inside `search`
    pub fn panicking(mut self) -> Self {
        self.panic_on_search = true;
        self
    }

    pub fn set_results(&self, results: Vec<SearchResult>) {
        if let Ok(mut guard) = self.results.lock() {
            *guard = results;
        }
    }

    pub fn set_error(&self, error: Option<SourceError>) {
        if let Ok(mut guard) = self.error.lock() {
            *guard = error;
        }
    }

    /// Number of `search` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn capabilities(&self) -> SourceCapabilities {
        match self.kind {
            SourceKind::Academic => SourceCapabilities::SEARCH | SourceCapabilities::AUTHOR_LOOKUP,
            _ => SourceCapabilities::SEARCH,
        }
    }

    fn max_results(&self) -> usize {
        50
    }

    async fn search(
        &self,
        _query: &str,
        num_results: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic_on_search {
            panic!("mock source panicked");
        }
        if let Some(error) = self.error.lock().ok().and_then(|e| e.clone()) {
            return Err(error);
        }
        let results = self.results.lock().map(|r| r.clone()).unwrap_or_default();
        Ok(results.into_iter().take(num_results).collect())
    }

    async fn author_info(&self, name: &str) -> Result<AuthorProfile, SourceError> {
        if self.kind != SourceKind::Academic {
            return Err(SourceError::NotImplemented);
        }
        Ok(AuthorProfile {
            name: name.to_string(),
            ..AuthorProfile::default()
        })
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        match self.error.lock().ok().and_then(|e| e.clone()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// One plausible result of the given kind
pub fn make_result(kind: SourceKind, title: &str) -> SearchResult {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    match kind {
        SourceKind::Academic => {
            SearchResult::Academic(AcademicResult::new(title, format!("https://example.org/paper/{}", slug)))
        }
        SourceKind::Web => {
            SearchResult::Web(WebResult::new(title, format!("https://example.com/{}", slug)))
        }
        SourceKind::Video => SearchResult::Video(VideoResult::new(title, slug)),
    }
}
