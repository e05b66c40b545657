//! Registry of configured provider adapters and the services they share.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ScholarSource, Source, SourceError, WebSearchSource, YouTubeSource};
use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::SourceKind;
use crate::monitoring::{audit, MetricsRecorder, NoopMetrics, UsageTracker};
use crate::utils::{api_retry_config, with_retry, HttpClient, RetryConfig};

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const AUTHOR_LOOKUP = 1 << 1;
        /// Upstream enforces a daily call quota
        const DAILY_QUOTA = 1 << 2;
    }
}

/// Services shared by every adapter
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub cache: Arc<CacheStore>,
    pub usage: Arc<UsageTracker>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub http: HttpClient,
    pub retry: RetryConfig,
}

impl SourceContext {
    pub fn new(
        cache: Arc<CacheStore>,
        usage: Arc<UsageTracker>,
        metrics: Arc<dyn MetricsRecorder>,
        http: HttpClient,
        retry: RetryConfig,
    ) -> Self {
        Self {
            cache,
            usage,
            metrics,
            http,
            retry,
        }
    }

    /// In-memory cache, no quotas, no metrics
    pub fn standalone() -> Self {
        Self::new(
            Arc::new(CacheStore::memory(1000)),
            Arc::new(UsageTracker::unlimited()),
            Arc::new(NoopMetrics),
            HttpClient::new(Duration::from_secs(30)),
            api_retry_config(),
        )
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    /// Serve `key` from the cache, or run `load` and store its result.
    ///
    /// Errors are never cached.
    pub async fn cached<T, F, Fut>(
        &self,
        kind: SourceKind,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, SourceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        if let Some(hit) = self.cache.get_json::<T>(key).await {
            tracing::debug!("{} cache hit for {}", kind.name(), key);
            self.metrics.record_cache(kind.id(), true);
            return Ok(hit);
        }
        self.metrics.record_cache(kind.id(), false);

        let value = load().await?;
        self.cache.set_json(key, &value, ttl).await;
        Ok(value)
    }

    /// Call upstream through `retry`, enforcing the daily quota and
    /// counting every attempt.
    pub async fn call_upstream<T, F, Fut>(
        &self,
        kind: SourceKind,
        retry: RetryConfig,
        mut fetch: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let started = Instant::now();
        let result = with_retry(retry, || {
            let attempt = match self.usage.try_consume(kind) {
                Ok(()) => Ok(fetch()),
                Err(retry_after) => {
                    tracing::warn!(
                        "{} daily quota exhausted, resets in {}s",
                        kind.name(),
                        retry_after
                    );
                    self.metrics.record_rate_limited(kind.id());
                    Err(SourceError::RateLimit {
                        service: kind.name().to_string(),
                        retry_after,
                    })
                }
            };
            async move {
                let pending = attempt?;
                let outcome = pending.await;
                if outcome.is_err() {
                    self.usage.record_error(kind);
                }
                outcome
            }
        })
        .await;

        let elapsed = started.elapsed();
        self.metrics
            .record_api_call(kind.id(), result.is_ok(), elapsed);
        let status = result.as_ref().err().and_then(|e| e.status_code());
        audit::api_call(kind.id(), result.is_ok(), elapsed, status);
        result
    }
}

/// Registry for the configured adapters, keyed by provider kind
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceKind, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every adapter whose settings are complete
    pub fn from_config(config: &Config, context: &SourceContext) -> Self {
        let mut registry = Self::new();

        match ScholarSource::from_config(config, context.clone()) {
            Ok(source) => registry.register(Arc::new(source)),
            Err(e) => tracing::info!("Academic search unavailable: {}", e),
        }
        match WebSearchSource::from_config(config, context.clone()) {
            Ok(source) => registry.register(Arc::new(source)),
            Err(e) => tracing::info!("Web search unavailable: {}", e),
        }
        match YouTubeSource::from_config(config, context.clone()) {
            Ok(source) => registry.register(Arc::new(source)),
            Err(e) => tracing::info!("Video search unavailable: {}", e),
        }

        tracing::debug!("Registered sources: {:?}", registry.kinds());
        registry
    }

    /// Register a source, replacing any adapter of the same kind
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.kind(), source);
    }

    /// Get a source by kind
    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn Source>> {
        self.sources.get(&kind)
    }

    /// Get a source by kind, returning an error if it is not configured
    pub fn get_required(&self, kind: SourceKind) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(kind)
            .ok_or_else(|| SourceError::NotConfigured(kind.name().to_string()))
    }

    /// Get all registered sources in kind order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Kinds with a registered adapter
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.keys().copied().collect()
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Check if a source is registered
    pub fn has(&self, kind: SourceKind) -> bool {
        self.sources.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
