//! Bounded in-process cache backend with per-entry TTL.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheError};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Expires each entry at its own deadline
struct EntryExpiry;

impl Expiry<String, MemoryEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// In-process cache backed by [`moka`], evicting by size and TTL
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    cache: Cache<String, MemoryEntry>,
    max_entries: u64,
}

impl MemoryBackend {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self { cache, max_entries }
    }

    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    async fn live_entry(&self, key: &str) -> Option<MemoryEntry> {
        let entry = self.cache.get(key).await?;
        if entry.is_live(Instant::now()) {
            Some(entry)
        } else {
            self.cache.invalidate(key).await;
            None
        }
    }

    fn live_keys(&self, prefix: Option<&str>) -> Vec<String> {
        let now = Instant::now();
        self.cache
            .iter()
            .filter(|(key, entry)| {
                entry.is_live(now) && prefix.map_or(true, |p| key.starts_with(p))
            })
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.live_entry(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .cache
            .remove(key)
            .await
            .map_or(false, |entry| entry.is_live(Instant::now())))
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<usize, CacheError> {
        let keys = self.live_keys(prefix);
        match prefix {
            None => self.cache.invalidate_all(),
            Some(_) => {
                for key in &keys {
                    self.cache.invalidate(key.as_str()).await;
                }
            }
        }
        Ok(keys.len())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(self
            .live_entry(key)
            .await
            .map(|entry| entry.expires_at.saturating_duration_since(Instant::now())))
    }

    async fn entry_count(&self) -> Option<u64> {
        self.cache.run_pending_tasks().await;
        Some(self.cache.entry_count())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
