//! Key-value cache with TTL, pluggable backends and hit/miss accounting.
//!
//! [`CacheStore`] always owns an in-process [`MemoryBackend`]. When a remote
//! backend is configured (Redis, behind the `cache-redis` feature) it becomes
//! the primary store; any remote failure or timeout is counted, logged and
//! served from the in-process map instead. Cache problems never surface to
//! callers: a failed read is a miss and a failed write is dropped.
//!
//! # Keys
//!
//! Keys are `"<source>:<hash>"` where the hash is the first 16 hex digits of
//! SHA-256 over the canonical (key-sorted) JSON of the request parameters,
//! see [`CacheStore::make_key`].

mod memory;
#[cfg(feature = "cache-redis")]
mod redis;

pub use memory::MemoryBackend;
#[cfg(feature = "cache-redis")]
pub use redis::RedisBackend;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Errors raised by cache backends. Recovered inside [`CacheStore`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Storage backend for [`CacheStore`]
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Short backend name reported in stats
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a live entry was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key starting with `prefix` (all keys for `None`)
    async fn clear(&self, prefix: Option<&str>) -> Result<usize, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Approximate number of stored entries, if the backend can tell cheaply
    async fn entry_count(&self) -> Option<u64>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Snapshot of cache counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    pub total_requests: u64,
    /// Hit percentage rounded to two decimals
    pub hit_rate: f64,
    pub entries: Option<u64>,
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl CacheCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cache facade used by adapters and the orchestrator
#[derive(Debug)]
pub struct CacheStore {
    enabled: bool,
    local: MemoryBackend,
    remote: Option<Arc<dyn CacheBackend>>,
    op_timeout: Duration,
    counters: CacheCounters,
}

impl CacheStore {
    /// In-process cache holding at most `max_entries` entries
    pub fn memory(max_entries: u64) -> Self {
        Self {
            enabled: true,
            local: MemoryBackend::new(max_entries),
            remote: None,
            op_timeout: Duration::from_secs(2),
            counters: CacheCounters::default(),
        }
    }

    /// A store that never holds anything; every lookup is a miss
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::memory(1)
        }
    }

    /// Use `remote` as the primary backend, keeping the in-process map as fallback
    pub fn with_remote(mut self, remote: Arc<dyn CacheBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Bound every remote operation by `op_timeout`
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Build the store described by `config`.
    ///
    /// A configured Redis URL that cannot be reached at startup is logged and
    /// the store runs on the in-process backend alone.
    pub async fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            tracing::info!("Cache is disabled");
            return Self::disabled();
        }

        let store = Self::memory(config.max_entries)
            .with_op_timeout(Duration::from_millis(config.operation_timeout_ms));

        match config.redis_url.as_deref() {
            Some(url) if !url.is_empty() => store.attach_redis(url, config).await,
            _ => {
                tracing::info!("Using in-memory cache ({} entries max)", config.max_entries);
                store
            }
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn attach_redis(self, url: &str, config: &CacheConfig) -> Self {
        match RedisBackend::connect(url, &config.redis_key_prefix, self.op_timeout).await {
            Ok(backend) => {
                tracing::info!("Using Redis cache backend");
                self.with_remote(Arc::new(backend))
            }
            Err(e) => {
                tracing::warn!("Redis unavailable ({}), falling back to in-memory cache", e);
                self
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn attach_redis(self, _url: &str, _config: &CacheConfig) -> Self {
        tracing::warn!(
            "redis_url is set but this build lacks the cache-redis feature, using in-memory cache"
        );
        self
    }

    /// Derive a cache key from a source prefix and request parameters
    pub fn make_key(source: &str, params: &Value) -> String {
        let mut canonical = String::new();
        write_canonical(params, &mut canonical);
        let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
        format!("{}:{}", source, &digest[..16])
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Name of the backend currently serving as primary
    pub fn backend_name(&self) -> &'static str {
        match &self.remote {
            _ if !self.enabled => "disabled",
            Some(remote) => remote.name(),
            None => self.local.name(),
        }
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }

    fn remote_failed(&self, op: &str, key: &str, err: &CacheError) {
        CacheCounters::bump(&self.counters.errors);
        tracing::warn!("Cache {} failed for {} ({}), using in-memory fallback", op, key, err);
    }

    /// Look up a value; `None` on miss, expiry or backend failure
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.enabled {
            CacheCounters::bump(&self.counters.misses);
            return None;
        }

        let value = match &self.remote {
            Some(remote) => match self.bounded(remote.get(key)).await {
                Ok(value) => value,
                Err(e) => {
                    self.remote_failed("get", key, &e);
                    self.local.get(key).await.ok().flatten()
                }
            },
            None => self.local.get(key).await.ok().flatten(),
        };

        if value.is_some() {
            CacheCounters::bump(&self.counters.hits);
            tracing::debug!("Cache HIT: {}", key);
        } else {
            CacheCounters::bump(&self.counters.misses);
            tracing::debug!("Cache MISS: {}", key);
        }
        value
    }

    /// Store a value for `ttl`; returns whether it was stored
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        if !self.enabled || ttl.is_zero() {
            return false;
        }

        let stored = match &self.remote {
            Some(remote) => match self.bounded(remote.set(key, value.clone(), ttl)).await {
                Ok(()) => true,
                Err(e) => {
                    self.remote_failed("set", key, &e);
                    self.local.set(key, value, ttl).await.is_ok()
                }
            },
            None => self.local.set(key, value, ttl).await.is_ok(),
        };

        if stored {
            CacheCounters::bump(&self.counters.sets);
            tracing::debug!("Cached {} for {:?}", key, ttl);
        }
        stored
    }

    /// Remove a key; returns whether a live entry existed
    pub async fn delete(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let local = self.local.delete(key).await.unwrap_or(false);
        let remote = match &self.remote {
            Some(remote) => match self.bounded(remote.delete(key)).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    self.remote_failed("delete", key, &e);
                    false
                }
            },
            None => false,
        };

        let deleted = local || remote;
        if deleted {
            CacheCounters::bump(&self.counters.deletes);
        }
        deleted
    }

    /// Remove every entry of one source (`Some("web")` clears `web:*`), or
    /// everything for `None`. Returns the number of entries removed.
    pub async fn clear(&self, source: Option<&str>) -> usize {
        let prefix = source.map(|s| {
            if s.ends_with(':') {
                s.to_string()
            } else {
                format!("{}:", s)
            }
        });
        let prefix = prefix.as_deref();

        let mut removed = self.local.clear(prefix).await.unwrap_or(0);
        if let Some(remote) = &self.remote {
            match self.bounded(remote.clear(prefix)).await {
                Ok(count) => removed += count,
                Err(e) => self.remote_failed("clear", prefix.unwrap_or("*"), &e),
            }
        }

        self.counters
            .deletes
            .fetch_add(removed as u64, Ordering::Relaxed);
        tracing::info!("Cleared {} cache entries ({})", removed, prefix.unwrap_or("all"));
        removed
    }

    /// Whether a live entry exists for `key`
    pub async fn exists(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.remote {
            Some(remote) => match self.bounded(remote.exists(key)).await {
                Ok(found) => found,
                Err(e) => {
                    self.remote_failed("exists", key, &e);
                    self.local.exists(key).await.unwrap_or(false)
                }
            },
            None => self.local.exists(key).await.unwrap_or(false),
        }
    }

    /// Time left before `key` expires
    pub async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        match &self.remote {
            Some(remote) => match self.bounded(remote.remaining_ttl(key)).await {
                Ok(ttl) => ttl,
                Err(e) => {
                    self.remote_failed("ttl", key, &e);
                    self.local.remaining_ttl(key).await.ok().flatten()
                }
            },
            None => self.local.remaining_ttl(key).await.ok().flatten(),
        }
    }

    /// Deserialize a cached JSON value. Undecodable entries count as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                CacheCounters::bump(&self.counters.errors);
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Serialize `value` as JSON and store it
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => {
                CacheCounters::bump(&self.counters.errors);
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                false
            }
        }
    }

    /// Whether the primary backend answers
    pub async fn health_check(&self) -> bool {
        match &self.remote {
            Some(remote) => self.bounded(remote.ping()).await.is_ok(),
            None => true,
        }
    }

    /// Current counters
    pub async fn get_stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            (hits as f64 / total_requests as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        let entries = match &self.remote {
            Some(remote) => {
                match self.bounded(async { Ok(remote.entry_count().await) }).await {
                    Ok(count) => count,
                    Err(e) => {
                        self.remote_failed("entry_count", "*", &e);
                        None
                    }
                }
            }
            None => self.local.entry_count().await,
        };

        CacheStats {
            backend: self.backend_name().to_string(),
            enabled: self.enabled,
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            total_requests,
            hit_rate,
            entries,
        }
    }
}

/// Serialize JSON with object keys sorted at every level
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
