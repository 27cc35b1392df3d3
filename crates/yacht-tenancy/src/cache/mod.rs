//! Tenant-tagged caching
//!
//! Provides pluggable cache backends with a unified async interface and the
//! [`TenantCache`] read-through layer on top of them.
//!
//! # Available Backends
//!
//! - [`NoopCache`] - No-op implementation (caching disabled)
//! - [`InMemoryCache`] - Thread-safe in-memory cache with TTL and tag index
//!
//! # Observability
//!
//! Wrap any cache with [`TracedCache`] to add tracing spans and logging.
//!
//! # Tenant Isolation
//!
//! Keys begin with the tenant selector and every entry carries the owner tag
//! of that selector, so:
//!
//! - **Two tenants can never share a key**, whatever the remaining parameters
//! - **An entry is only served to the tenant whose owner tag it carries**
//! - **A tenant's writes only invalidate that tenant's tags**
//!
//! Admin-wide entries live in their own tag namespace and are swept with
//! [`TenantCache::invalidate_admin_wide`].
//!
//! # Staleness
//!
//! Cached reads may lag a committed write until the write's invalidation lands
//! or the entry's TTL expires (10s chat, 30s tasks and expenses, 60s cards and
//! crew, 300s plans). Reads through the accessors never lag.

mod config;
mod error;
mod key;
mod memory;
mod noop;
mod provider;
mod read_through;
mod tag;
mod traced;

use std::sync::Arc;

pub use config::{CacheBackend, CacheConfig, CacheTtlConfig, DEFAULT_MAX_VALUE_SIZE};
pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, KeyParts, build_key};
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use provider::{CacheEntry, CacheProvider, CacheStats};
pub use read_through::TenantCache;
pub use tag::{Tag, TagSet, build_tags};
pub use traced::TracedCache;

/// Create a cache provider based on configuration
#[must_use]
pub fn create_cache(config: &CacheConfig) -> Arc<dyn CacheProvider> {
    if !config.enabled {
        return Arc::new(NoopCache::new());
    }

    match config.backend {
        CacheBackend::Noop => Arc::new(NoopCache::new()),
        CacheBackend::Memory => {
            let mut cache = InMemoryCache::new().with_max_value_size(config.max_value_size);

            if let Some(max) = config.max_entries {
                cache = cache.with_max_entries(max);
            }

            Arc::new(TracedCache::new(cache, "yacht-tenancy"))
        }
    }
}

/// Read-through cache over the configured backend
#[must_use]
pub fn create_tenant_cache(config: &CacheConfig) -> TenantCache {
    TenantCache::new(create_cache(config), config.ttl)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::query::EntityKind;
    use crate::tenant::{Role, TenantId, TenantSelector};

    fn selector() -> TenantSelector {
        TenantSelector::Tenant(TenantId::new("yacht-1").unwrap())
    }

    fn key() -> CacheKey {
        KeyParts::new(selector(), Role::Crew, "u1", "list_tasks").build()
    }

    #[tokio::test]
    async fn test_create_cache_disabled_never_stores() {
        let cache = create_cache(&CacheConfig::disabled());
        let tags = build_tags(&selector(), EntityKind::Task);

        cache.set(&key(), b"data", &tags, None).await.unwrap();
        assert!(cache.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_cache_noop_backend() {
        let config = CacheConfig {
            backend: CacheBackend::Noop,
            ..Default::default()
        };
        let cache = create_cache(&config);
        let tags = build_tags(&selector(), EntityKind::Task);

        cache.set(&key(), b"data", &tags, None).await.unwrap();
        assert!(cache.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_cache_memory_functional() {
        let config = CacheConfig {
            max_entries: Some(100),
            ..Default::default()
        };
        let cache = create_cache(&config);
        let tags = build_tags(&selector(), EntityKind::Task);

        cache
            .set(&key(), b"test data", &tags, Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert!(cache.get(&key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_cache_memory_with_custom_max_value_size() {
        let config = CacheConfig {
            max_value_size: 100,
            ..Default::default()
        };
        let cache = create_cache(&config);
        let tags = build_tags(&selector(), EntityKind::Task);

        cache.set(&key(), &[0u8; 50], &tags, None).await.unwrap();
        assert!(cache.get(&key()).await.unwrap().is_some());

        let result = cache.set(&key(), &[0u8; 200], &tags, None).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_create_tenant_cache_uses_configured_ttls() {
        let cache = create_tenant_cache(&CacheConfig::default());
        assert_eq!(
            cache.ttl_config().for_kind(EntityKind::ChatMessage),
            Duration::from_secs(10)
        );
    }
}
