//! Redis cache backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{CacheBackend, CacheError};

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            CacheError::Unavailable(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

/// Networked cache backend. Keys are namespaced with a configurable prefix.
pub struct RedisBackend {
    client: redis::Client,
    key_prefix: String,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisBackend {
    /// Open a client for `url` and verify it answers within `timeout`
    pub async fn connect(url: &str, key_prefix: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let backend = Self {
            client,
            key_prefix: key_prefix.trim_end_matches(':').to_string(),
            connection: OnceCell::new(),
        };

        match tokio::time::timeout(timeout, backend.ping()).await {
            Ok(result) => result?,
            Err(_) => return Err(CacheError::Timeout(timeout)),
        }
        Ok(backend)
    }

    /// Shared multiplexed connection, established on first use
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!("Opening Redis connection");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(self.namespaced(key), value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: usize = conn.del(self.namespaced(key)).await?;
        Ok(removed > 0)
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<usize, CacheError> {
        let pattern = format!("{}:{}*", self.key_prefix, prefix.unwrap_or(""));
        let keys = self.scan_keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let found: bool = conn.exists(self.namespaced(key)).await?;
        Ok(found)
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let mut conn = self.connection().await?;
        let ttl: i64 = conn.ttl(self.namespaced(key)).await?;
        // -2: missing key, -1: no expiry
        Ok(match ttl {
            t if t >= 0 => Some(Duration::from_secs(t as u64)),
            _ => None,
        })
    }

    async fn entry_count(&self) -> Option<u64> {
        let pattern = format!("{}:*", self.key_prefix);
        self.scan_keys(&pattern).await.ok().map(|keys| keys.len() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
