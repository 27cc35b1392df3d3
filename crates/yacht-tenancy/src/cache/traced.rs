//! Traced cache wrapper for observability

use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheEntry, CacheProvider, CacheStats};
use super::tag::{Tag, TagSet};

/// Wrapper that adds tracing to any `CacheProvider`
///
/// Spans are debug-level. Keys carry principal ids, so they stay out of
/// production logs unless debug is enabled for this module.
pub struct TracedCache<C> {
    inner: C,
    service_name: String,
}

impl<C: std::fmt::Debug> std::fmt::Debug for TracedCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedCache")
            .field("inner", &self.inner)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl<C: Clone> Clone for TracedCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

impl<C> TracedCache<C> {
    pub fn new(cache: C, service_name: impl Into<String>) -> Self {
        Self {
            inner: cache,
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl<C: CacheProvider> CacheProvider for TracedCache<C> {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let span = tracing::debug_span!(
            "cache.get",
            service = %self.service_name,
            cache.key = %key,
            tenant.selector = %key.selector(),
            otel.name = "cache.get",
        );

        let result = self.inner.get(key).instrument(span).await;

        match &result {
            Ok(Some(entry)) => {
                tracing::debug!(
                    cache.result = "hit",
                    cache.key = %key,
                    cache.size_bytes = entry.value.len(),
                );
            }
            Ok(None) => {
                tracing::debug!(cache.result = "miss", cache.key = %key);
            }
            Err(e) => {
                tracing::warn!(cache.result = "error", cache.key = %key, error = %e);
            }
        }

        result
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        tags: &TagSet,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let span = tracing::debug_span!(
            "cache.set",
            service = %self.service_name,
            cache.key = %key,
            tenant.selector = %tags.selector(),
            cache.tag_count = tags.len(),
            cache.value_size = value.len(),
            cache.ttl_secs = ttl.map(|d| d.as_secs()),
            otel.name = "cache.set",
        );

        let result = self.inner.set(key, value, tags, ttl).instrument(span).await;

        if let Err(ref e) = result {
            tracing::warn!(
                cache.operation = "set",
                cache.key = %key,
                error = %e,
            );
        }

        result
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let span = tracing::debug_span!(
            "cache.delete",
            service = %self.service_name,
            cache.key = %key,
            otel.name = "cache.delete",
        );

        let result = self.inner.delete(key).instrument(span).await;

        match &result {
            Ok(deleted) => {
                tracing::debug!(
                    cache.operation = "delete",
                    cache.key = %key,
                    cache.deleted = deleted,
                );
            }
            Err(e) => {
                tracing::warn!(
                    cache.operation = "delete",
                    cache.key = %key,
                    error = %e,
                );
            }
        }

        result
    }

    async fn invalidate_tag(&self, tag: &Tag) -> CacheResult<u64> {
        let span = tracing::debug_span!(
            "cache.invalidate_tag",
            service = %self.service_name,
            cache.tag = %tag,
            otel.name = "cache.invalidate_tag",
        );

        let result = self.inner.invalidate_tag(tag).instrument(span).await;

        match &result {
            Ok(count) => {
                tracing::debug!(
                    cache.operation = "invalidate_tag",
                    cache.tag = %tag,
                    cache.deleted_count = count,
                );
            }
            Err(e) => {
                tracing::warn!(
                    cache.operation = "invalidate_tag",
                    cache.tag = %tag,
                    error = %e,
                );
            }
        }

        result
    }

    async fn clear(&self) -> CacheResult<()> {
        let span = tracing::debug_span!(
            "cache.clear",
            service = %self.service_name,
            otel.name = "cache.clear",
        );

        let result = self.inner.clear().instrument(span).await;

        match &result {
            Ok(()) => tracing::debug!(cache.operation = "clear"),
            Err(e) => tracing::warn!(cache.operation = "clear", error = %e),
        }

        result
    }

    async fn health_check(&self) -> CacheResult<()> {
        let span = tracing::debug_span!("cache.health_check", otel.name = "cache.health_check");

        self.inner.health_check().instrument(span).await
    }

    async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}
