//! Fast-layer key-value cache with TTL-bound entries
//!
//! The [`Cache`] trait is the seam between the checkpoint store and the
//! fast store backing it. The reference implementation is
//! [`InMemoryCache`], a thread-safe map with lazy TTL expiry; production
//! deployments can implement the trait over Redis or any other cache that
//! offers atomic set and TTL semantics.
//!
//! TTL deadlines use [`tokio::time::Instant`] so tests can age entries
//! across the full retention window under a paused clock.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// One cache entry dumped by the durability sweeper: key, raw value, and
/// remaining TTL in seconds (`None` for entries that never expire).
pub type DumpedEntry = (String, Vec<u8>, Option<u64>);

/// Key-value cache abstraction for the fast layer
///
/// Writes to a given key are atomic: concurrent `set` calls for the same key
/// are linearized by the implementation, and readers observe exactly one of
/// the written values. This is what linearizes latest-pointer updates.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a value; expired entries read as absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value with no expiry (used for latest pointers)
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Write a value that expires `ttl` after now
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// List live entries whose key starts with `prefix`
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Full live content of the cache, for the durability sweep
    async fn dump_entries(&self) -> Result<Vec<DumpedEntry>>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Thread-safe in-memory cache with lazy TTL expiry
///
/// Suitable for tests, single-process deployments, and as the reference
/// for backend implementations. Expired entries are dropped on read and
/// swept opportunistically on write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the cache holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all entries (useful for testing)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Remove expired entries eagerly
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, e| !e.is_expired(now));
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && !e.is_expired(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }

    async fn dump_entries(&self) -> Result<Vec<DumpedEntry>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, e)| {
                let ttl = e
                    .expires_at
                    .map(|deadline| deadline.saturating_duration_since(now).as_secs());
                (k.clone(), e.value.clone(), ttl)
            })
            .collect())
    }
}
