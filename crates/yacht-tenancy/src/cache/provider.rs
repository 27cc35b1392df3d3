//! Cache provider trait definition

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::error::CacheResult;
use super::key::CacheKey;
use super::tag::{Tag, TagSet};

/// Stored value together with the tags it was written with
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub tags: TagSet,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(value: Vec<u8>, tags: TagSet, ttl: Option<Duration>) -> Self {
        Self {
            value,
            tags,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }

    #[must_use]
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|exp| exp.checked_duration_since(Instant::now()))
    }
}

/// Cache statistics for metrics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    pub errors: u64,
    pub size_bytes: Option<u64>,
    pub entry_count: Option<u64>,
}

/// Async cache provider trait
///
/// Backends store opaque bytes under an encoded [`CacheKey`] and keep a tag
/// index so every entry carrying a tag can be dropped in one call.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Live entry for `key`. Expired entries are reported as absent.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    /// Store `value` under `key` with its tags and optional TTL
    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        tags: &TagSet,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Delete a key from cache
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Drop every entry carrying `tag`. Returns the number removed.
    async fn invalidate_tag(&self, tag: &Tag) -> CacheResult<u64>;

    /// Clear entire cache
    async fn clear(&self) -> CacheResult<()>;

    /// Health check for the cache backend
    async fn health_check(&self) -> CacheResult<()>;

    /// Get cache statistics for observability
    async fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantSelector;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.invalidations, 0);
        assert!(stats.size_bytes.is_none());
        assert!(stats.entry_count.is_none());
    }

    #[test]
    fn test_entry_expiry() {
        let tags = TagSet::for_owner(&TenantSelector::AdminWide);
        let fresh = CacheEntry::new(vec![1], tags.clone(), Some(Duration::from_secs(60)));
        assert!(!fresh.is_expired());
        assert!(fresh.ttl_remaining().is_some());

        let expired = CacheEntry::new(vec![1], tags.clone(), Some(Duration::ZERO));
        assert!(expired.is_expired());

        let forever = CacheEntry::new(vec![1], tags, None);
        assert!(!forever.is_expired());
        assert!(forever.ttl_remaining().is_none());
    }
}
