//! No-op cache implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheEntry, CacheProvider, CacheStats};
use super::tag::{Tag, TagSet};

/// Cache that never stores. Every read-through call computes.
///
/// Used for testing and when caching is disabled.
#[derive(Debug, Clone, Default)]
pub struct NoopCache {
    misses: Arc<AtomicU64>,
    invalidations: Arc<AtomicU64>,
}

impl NoopCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheProvider for NoopCache {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _value: &[u8],
        _tags: &TagSet,
        _ttl: Option<Duration>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> CacheResult<bool> {
        Ok(false)
    }

    async fn invalidate_tag(&self, _tag: &Tag) -> CacheResult<u64> {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(0)
    }

    async fn clear(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::KeyParts;
    use crate::tenant::{Role, TenantSelector};

    fn key() -> CacheKey {
        KeyParts::new(TenantSelector::AdminWide, Role::SuperAdmin, "root", "list").build()
    }

    #[tokio::test]
    async fn test_noop_set_then_get_is_none() {
        let cache = NoopCache::new();
        let tags = TagSet::for_owner(&TenantSelector::AdminWide);

        cache
            .set(&key(), b"data", &tags, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(cache.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_delete_and_invalidate_remove_nothing() {
        let cache = NoopCache::new();
        assert!(!cache.delete(&key()).await.unwrap());
        assert_eq!(cache.invalidate_tag(&Tag::admin_wide()).await.unwrap(), 0);
        assert!(cache.clear().await.is_ok());
        assert!(cache.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_clone_shares_stats() {
        let cache = NoopCache::new();
        let cache_clone = cache.clone();

        cache.get(&key()).await.unwrap();
        cache_clone.get(&key()).await.unwrap();
        cache_clone.invalidate_tag(&Tag::admin_wide()).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.invalidations, 1);
    }
}
