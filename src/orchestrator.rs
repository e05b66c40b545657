//! Unified search orchestration.
//!
//! [`UnifiedSearch`] fans one request out to every requested provider
//! concurrently. Each provider runs in its own task with its own timeout and
//! panic boundary, so one failing provider only fills its own slot in
//! [`SearchResponse::errors`]. Complete responses are cached under a
//! composite key.

use futures_util::FutureExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::cache::CacheStore;
use crate::config::{Config, RateLimitConfig};
use crate::models::{AuthorProfile, SearchFilters, SearchRequest, SearchResponse, SearchResult, SourceKind};
use crate::monitoring::{
    audit, CacheStatus, HealthStatus, InMemoryMetrics, MetricsRecorder, ServiceStatus,
    SourceStatus, UsageStats, UsageTracker,
};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceRegistry};
use crate::utils::validate::{validate_num_results, validate_query, ValidationError, MAX_AUTHOR_CHARS};
use crate::utils::{HttpClient, RateGate};

/// Cache prefix of composite responses
const UNIFIED_CACHE_PREFIX: &str = "unified";

/// Errors that fail a whole unified search
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnifiedSearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No search sources are configured")]
    NoAdapters,
}

/// Builder for [`UnifiedSearch`]
pub struct UnifiedSearchBuilder {
    registry: SourceRegistry,
    cache: Arc<CacheStore>,
    usage: Arc<UsageTracker>,
    metrics: Arc<InMemoryMetrics>,
    rate_limits: RateLimitConfig,
    source_timeout: Duration,
    unified_ttl: Duration,
}

impl UnifiedSearchBuilder {
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one more adapter
    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.registry.register(source);
        self
    }

    pub fn cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn metrics(mut self, metrics: Arc<InMemoryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn unified_ttl(mut self, ttl: Duration) -> Self {
        self.unified_ttl = ttl;
        self
    }

    pub fn build(self) -> UnifiedSearch {
        UnifiedSearch {
            registry: self.registry,
            cache: self.cache,
            gate: Arc::new(RateGate::new()),
            usage: self.usage,
            metrics: self.metrics,
            rate_limits: self.rate_limits,
            source_timeout: self.source_timeout,
            unified_ttl: self.unified_ttl,
            started: Instant::now(),
        }
    }
}

/// Concurrent multi-provider search with caching and rate limiting
#[derive(Debug)]
pub struct UnifiedSearch {
    registry: SourceRegistry,
    cache: Arc<CacheStore>,
    gate: Arc<RateGate>,
    usage: Arc<UsageTracker>,
    metrics: Arc<InMemoryMetrics>,
    rate_limits: RateLimitConfig,
    source_timeout: Duration,
    unified_ttl: Duration,
    started: Instant,
}

impl UnifiedSearch {
    /// Builder with an empty registry, an in-memory cache and no quotas
    pub fn builder() -> UnifiedSearchBuilder {
        let defaults = Config::default();
        UnifiedSearchBuilder {
            registry: SourceRegistry::new(),
            cache: Arc::new(CacheStore::memory(defaults.cache.max_entries)),
            usage: Arc::new(UsageTracker::unlimited()),
            metrics: Arc::new(InMemoryMetrics::new()),
            rate_limits: defaults.rate_limits,
            source_timeout: defaults.search.source_timeout(),
            unified_ttl: defaults.cache.unified_ttl(),
        }
    }

    /// Wire cache, usage tracking, metrics and adapters from `config`
    pub async fn from_config(config: &Config) -> Self {
        let cache = Arc::new(CacheStore::from_config(&config.cache).await);
        let usage = Arc::new(UsageTracker::new(&config.quotas));
        let metrics = Arc::new(InMemoryMetrics::new());
        let http = match config.http.user_agent.as_deref() {
            Some(user_agent) => HttpClient::with_user_agent(user_agent, config.http.timeout()),
            None => HttpClient::new(config.http.timeout()),
        };

        let context = SourceContext::new(
            cache.clone(),
            usage.clone(),
            metrics.clone(),
            http,
            config.retry.to_retry_config(),
        );
        let registry = SourceRegistry::from_config(config, &context);
        if registry.is_empty() {
            tracing::warn!("No search sources are configured");
        }

        Self::builder()
            .registry(registry)
            .cache(cache)
            .usage(usage)
            .metrics(metrics)
            .rate_limits(config.rate_limits.clone())
            .source_timeout(config.search.source_timeout())
            .unified_ttl(config.cache.unified_ttl())
            .build()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn rate_gate(&self) -> &RateGate {
        &self.gate
    }

    /// Search every requested source concurrently
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, UnifiedSearchError> {
        self.search_with_cancel(request, std::future::pending::<()>()).await
    }

    /// Like [`search`](Self::search), but stops waiting once `cancel`
    /// resolves. Sources still running are aborted and reported as
    /// cancelled; results that already arrived are kept.
    pub async fn search_with_cancel<C>(
        &self,
        request: SearchRequest,
        cancel: C,
    ) -> Result<SearchResponse, UnifiedSearchError>
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let request = request.validated()?;
        if self.registry.is_empty() {
            return Err(UnifiedSearchError::NoAdapters);
        }

        let cache_key = match serde_json::to_value(&request) {
            Ok(params) => Some(CacheStore::make_key(UNIFIED_CACHE_PREFIX, &params)),
            Err(e) => {
                tracing::warn!("Request not cacheable: {}", e);
                None
            }
        };

        if let Some(key) = &cache_key {
            if let Some(mut cached) = self.cache.get_json::<SearchResponse>(key).await {
                tracing::debug!("Unified cache hit for '{}'", request.query);
                self.metrics.record_cache(UNIFIED_CACHE_PREFIX, true);
                cached.metadata_mut().cache_hit = true;
                cached.set_search_time(started.elapsed());
                audit::search_performed(
                    &request.query,
                    &cached.metadata().requested_sources,
                    cached.total_results(),
                    started.elapsed(),
                    true,
                );
                return Ok(cached);
            }
            self.metrics.record_cache(UNIFIED_CACHE_PREFIX, false);
        }

        let requested = if request.sources.is_empty() {
            self.registry.kinds()
        } else {
            request.sources.clone()
        };

        let mut response = SearchResponse::new(request.query.clone());
        let mut unavailable = Vec::new();
        let mut tasks = JoinSet::new();
        let mut outstanding = BTreeSet::new();

        for &kind in &requested {
            let Some(source) = self.registry.get(kind) else {
                let err = SourceError::NotConfigured(kind.name().to_string());
                self.report_error(kind, &err);
                response.set_error(kind, err.to_string());
                unavailable.push(kind);
                continue;
            };
            if let Err(err) = self.admit(&format!("search:{}", kind.id())) {
                self.report_error(kind, &err);
                response.set_error(kind, err.to_string());
                continue;
            }

            let source = Arc::clone(source);
            let query = request.query.clone();
            let filters = request.filters.clone();
            let num_results = request.num_results;
            let timeout = self.source_timeout;
            outstanding.insert(kind);
            tasks.spawn(async move {
                let started = Instant::now();
                let outcome = run_source(source, &query, num_results, &filters, timeout).await;
                (kind, outcome, started.elapsed())
            });
        }

        let mut cancelled = false;
        tokio::pin!(cancel);
        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    match joined {
                        Some(Ok((kind, outcome, elapsed))) => {
                            outstanding.remove(&kind);
                            self.merge_outcome(&mut response, kind, outcome, elapsed);
                        }
                        Some(Err(e)) if e.is_cancelled() => {}
                        Some(Err(e)) => tracing::error!("Search task failed: {}", e),
                        None => break,
                    }
                }
                _ = &mut cancel, if !cancelled => {
                    tracing::info!("Search for '{}' cancelled", request.query);
                    cancelled = true;
                    tasks.abort_all();
                }
            }
        }

        for kind in outstanding {
            let message = if cancelled {
                format!("{} search cancelled", kind.name())
            } else {
                format!("{} search task failed", kind.name())
            };
            response.set_error(kind, message);
        }

        let successful = response.results().keys().copied().collect();
        let metadata = response.metadata_mut();
        metadata.requested_sources = requested;
        metadata.successful_sources = successful;
        metadata.unavailable_sources = unavailable;
        metadata.cache_hit = false;
        response.set_search_time(started.elapsed());

        audit::search_performed(
            &request.query,
            &response.metadata().requested_sources,
            response.total_results(),
            started.elapsed(),
            false,
        );
        tracing::info!(
            "Search '{}' returned {} results from {} sources ({} errors) in {:?}",
            request.query,
            response.total_results(),
            response.results().len(),
            response.errors().len(),
            started.elapsed()
        );

        if let Some(key) = cache_key {
            if response.is_complete() && !cancelled {
                self.cache.set_json(&key, &response, self.unified_ttl).await;
            }
        }

        Ok(response)
    }

    /// Search one provider with the same gate, timeout and metrics as
    /// [`search`](Self::search)
    pub async fn search_source(
        &self,
        kind: SourceKind,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let query = validate_query(query)?;
        validate_num_results(num_results)?;
        filters.validate()?;

        let outcome = self.run_single(kind, &query, num_results, filters).await;
        if let Err(err) = &outcome {
            self.report_error(kind, err);
        }
        outcome
    }

    async fn run_single(
        &self,
        kind: SourceKind,
        query: &str,
        num_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let source = Arc::clone(self.registry.get_required(kind)?);
        self.admit(&format!("search:{}", kind.id()))?;

        let started = Instant::now();
        let outcome = run_source(source, query, num_results, filters, self.source_timeout).await;
        self.metrics
            .record_search(kind.id(), outcome.is_ok(), started.elapsed());
        outcome
    }

    /// Look up an author profile on the first provider that supports it
    pub async fn author_info(&self, name: &str) -> Result<AuthorProfile, SourceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("author_name").into());
        }
        if name.chars().count() > MAX_AUTHOR_CHARS {
            return Err(ValidationError::InvalidField {
                field: "author_name",
                reason: format!("must be at most {} characters", MAX_AUTHOR_CHARS),
            }
            .into());
        }

        let Some(source) = self
            .registry
            .with_capability(SourceCapabilities::AUTHOR_LOOKUP)
            .into_iter()
            .next()
            .cloned()
        else {
            return Err(SourceError::NotConfigured("Author lookup".to_string()));
        };
        let kind = source.kind();
        self.admit(&format!("author:{}", kind.id()))?;

        let lookup = AssertUnwindSafe(source.author_info(name)).catch_unwind();
        let outcome = match tokio::time::timeout(self.source_timeout, lookup).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(SourceError::Other(format!(
                "{} author lookup panicked: {}",
                source.name(),
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(SourceError::Timeout {
                service: source.name().to_string(),
                timeout: self.source_timeout,
            }),
        };
        if let Err(err) = &outcome {
            self.report_error(kind, err);
        }
        outcome
    }

    /// Remove cached entries of one provider, or everything.
    ///
    /// Clearing one provider also drops composite responses, which embed
    /// that provider's results.
    pub async fn clear_cache(&self, source: Option<SourceKind>) -> usize {
        match source {
            Some(kind) => {
                let removed = self.cache.clear(Some(kind.id())).await;
                removed + self.cache.clear(Some(UNIFIED_CACHE_PREFIX)).await
            }
            None => self.cache.clear(None).await,
        }
    }

    /// Usage counters, cache statistics and metrics
    pub async fn get_api_usage_stats(&self) -> UsageStats {
        UsageStats {
            usage: self.usage.report(),
            cache: self.cache.get_stats().await,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Readiness of every provider and the cache.
    ///
    /// With `probe` set, each configured provider runs a minimal live query.
    pub async fn get_service_status(&self, probe: bool) -> ServiceStatus {
        let checks = SourceKind::ALL.into_iter().map(|kind| self.source_status(kind, probe));
        let sources = futures_util::future::join_all(checks).await;

        let cache = CacheStatus {
            backend: self.cache.backend_name().to_string(),
            enabled: self.cache.is_enabled(),
            status: if self.cache.health_check().await {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
        };

        ServiceStatus {
            status: ServiceStatus::overall(&sources, &cache),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            checked_at: chrono::Utc::now(),
            sources,
            cache,
        }
    }

    async fn source_status(&self, kind: SourceKind, probe: bool) -> SourceStatus {
        let Some(source) = self.registry.get(kind) else {
            return SourceStatus {
                source: kind,
                name: kind.name().to_string(),
                configured: false,
                status: HealthStatus::Unhealthy,
                quota_remaining: None,
                probe_error: None,
            };
        };

        let quota_remaining = self.usage.remaining(kind);
        let mut status = if quota_remaining == Some(0) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let mut probe_error = None;
        if probe {
            let check = tokio::time::timeout(self.source_timeout, source.health_check()).await;
            let failure = match check {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!("probe timed out after {:?}", self.source_timeout)),
            };
            if let Some(message) = failure {
                tracing::warn!("{} health probe failed: {}", source.name(), message);
                status = HealthStatus::Degraded;
                probe_error = Some(message);
            }
        }

        SourceStatus {
            source: kind,
            name: source.name().to_string(),
            configured: true,
            status,
            quota_remaining,
            probe_error,
        }
    }

    /// Consult the sliding-window gate for `resource`
    fn admit(&self, resource: &str) -> Result<(), SourceError> {
        if !self.rate_limits.enabled {
            return Ok(());
        }
        let decision = self.gate.allow(
            resource,
            self.rate_limits.max_requests,
            self.rate_limits.window(),
        );
        if decision.allowed {
            return Ok(());
        }

        self.metrics.record_rate_limited(resource);
        let retry_after = decision.retry_after_secs().unwrap_or(1);
        tracing::warn!("Rate limit reached for {}, retry in {}s", resource, retry_after);
        Err(SourceError::RateLimit {
            service: resource.to_string(),
            retry_after,
        })
    }

    fn merge_outcome(
        &self,
        response: &mut SearchResponse,
        kind: SourceKind,
        outcome: Result<Vec<SearchResult>, SourceError>,
        elapsed: Duration,
    ) {
        self.metrics.record_search(kind.id(), outcome.is_ok(), elapsed);
        response
            .metadata_mut()
            .source_times_ms
            .insert(kind, u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));

        match outcome {
            Ok(results) => {
                tracing::debug!("{} returned {} results", kind.name(), results.len());
                response.set_results(kind, results);
            }
            Err(err) => {
                self.report_error(kind, &err);
                response.set_error(kind, err.to_string());
            }
        }
    }

    fn report_error(&self, kind: SourceKind, err: &SourceError) {
        tracing::warn!("{} failed: {}", kind.name(), err);
        self.metrics.record_error(err.error_type(), kind.id());
        audit::error_occurred(err.error_type(), kind.id(), &err.to_string());
    }
}

/// Run one provider search inside its timeout and panic boundary
async fn run_source(
    source: Arc<dyn Source>,
    query: &str,
    num_results: usize,
    filters: &SearchFilters,
    timeout: Duration,
) -> Result<Vec<SearchResult>, SourceError> {
    let search = AssertUnwindSafe(source.search(query, num_results, filters)).catch_unwind();
    match tokio::time::timeout(timeout, search).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(SourceError::Other(format!(
            "{} search panicked: {}",
            source.name(),
            panic_message(panic.as_ref())
        ))),
        Err(_) => Err(SourceError::Timeout {
            service: source.name().to_string(),
            timeout,
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
