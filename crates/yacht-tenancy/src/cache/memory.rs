//! In-memory cache implementation with TTL and tag index

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::config::DEFAULT_MAX_VALUE_SIZE;
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheEntry, CacheProvider, CacheStats};
use super::tag::{Tag, TagSet};

/// Entries and the tag index live under one lock so a tag invalidation never
/// observes an entry the index does not know about.
#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    tag_index: HashMap<Tag, HashSet<String>>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        for tag in entry.tags.iter() {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn insert(&mut self, key: String, entry: CacheEntry) {
        self.remove(&key);
        for tag in entry.tags.iter() {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn purge_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

#[derive(Default)]
struct InMemoryStats {
    hits: u64,
    misses: u64,
    sets: u64,
    deletes: u64,
    invalidations: u64,
}

/// Thread-safe in-memory cache with TTL support and tag invalidation
///
/// # Eviction Behavior
///
/// When `max_entries` is reached, expired entries are purged first. If the
/// cache is still full, the entry closest to expiry is evicted.
#[derive(Clone)]
pub struct InMemoryCache {
    inner: Arc<RwLock<Inner>>,
    stats: Arc<RwLock<InMemoryStats>>,
    max_entries: Option<usize>,
    max_value_size: usize,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("max_entries", &self.max_entries)
            .field("max_value_size", &self.max_value_size)
            .field("entry_count", &self.inner.read().entries.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            stats: Arc::new(RwLock::new(InMemoryStats::default())),
            max_entries: None,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_value_size(mut self, max: usize) -> Self {
        self.max_value_size = max;
        self
    }

    /// Number of distinct tags currently indexed
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.inner.read().tag_index.len()
    }

    /// Remove `key` only if the entry stored now is expired. A fresh `set`
    /// that landed after the expired read survives.
    fn remove_if_expired(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.entries.get(key).is_some_and(CacheEntry::is_expired) {
            inner.remove(key);
            return true;
        }
        false
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let inner = self.inner.read();

        match inner.entries.get(key.as_str()) {
            Some(entry) if !entry.is_expired() => {
                let entry = entry.clone();
                drop(inner);
                self.stats.write().hits += 1;
                Ok(Some(entry))
            }
            Some(_) => {
                drop(inner);
                self.remove_if_expired(key.as_str());
                self.stats.write().misses += 1;
                Ok(None)
            }
            None => {
                drop(inner);
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        tags: &TagSet,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }

        let entry = CacheEntry::new(value.to_vec(), tags.clone(), ttl);
        let mut inner = self.inner.write();

        if let Some(max) = self.max_entries
            && inner.entries.len() >= max
            && !inner.entries.contains_key(key.as_str())
            && inner.purge_expired() == 0
            && let Some(victim) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone())
        {
            inner.remove(&victim);
        }

        inner.insert(key.to_key_string(), entry);
        drop(inner);

        self.stats.write().sets += 1;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let removed = self.inner.write().remove(key.as_str()).is_some();

        if removed {
            self.stats.write().deletes += 1;
        }

        Ok(removed)
    }

    async fn invalidate_tag(&self, tag: &Tag) -> CacheResult<u64> {
        let mut inner = self.inner.write();
        let keys = inner.tag_index.remove(tag).unwrap_or_default();
        let mut removed = 0u64;
        for key in &keys {
            if inner.remove(key).is_some() {
                removed += 1;
            }
        }
        drop(inner);

        let mut stats = self.stats.write();
        stats.invalidations += 1;
        stats.deletes += removed;

        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.tag_index.clear();
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let stats = self.stats.read();
        let inner = self.inner.read();

        let live = inner.entries.values().filter(|e| !e.is_expired());
        let (entry_count, size_bytes) =
            live.fold((0u64, 0u64), |(n, b), e| (n + 1, b + e.value.len() as u64));
        drop(inner);

        CacheStats {
            hits: stats.hits,
            misses: stats.misses,
            sets: stats.sets,
            deletes: stats.deletes,
            invalidations: stats.invalidations,
            errors: 0,
            size_bytes: Some(size_bytes),
            entry_count: Some(entry_count),
        }
    }
}
