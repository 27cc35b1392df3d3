//! Tenant-aware read-through cache
//!
//! Every entry is written under a key and tag set built for the same tenant
//! selector, and an entry is only served back to a reader whose selector owns
//! it. Concurrent misses on one key share a single computation. Keys are
//! independent, so two tenants never wait on each other.
//!
//! Compute closures run outside the request. They receive the tenant selector
//! as an argument and must reach the store through [`UnscopedAccessor`] only.
//!
//! Invalidation may run detached from the write that triggered it (see
//! [`TenantCache::spawn_invalidation`]). Until it lands, cached reads can lag
//! the store by at most the entry TTL. Direct accessor reads never lag.
//!
//! [`UnscopedAccessor`]: crate::access::UnscopedAccessor

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::config::CacheTtlConfig;
use super::error::CacheError;
use super::key::{CacheKey, KeyParts};
use super::provider::{CacheProvider, CacheStats};
use super::tag::{Tag, TagSet, build_tags};
use crate::audit::{Violation, ViolationKind, record_violation};
use crate::error::{Error, Result};
use crate::query::{EntityKind, TenantIndependent};
use crate::tenant::{ContextSnapshot, ResolvedContext, TenantId, TenantSelector};

type Slot = Arc<tokio::sync::Mutex<Option<Vec<u8>>>>;
type Flights = parking_lot::Mutex<HashMap<String, Slot>>;

/// Holds one caller's handle on an in-flight slot. The slot leaves the map
/// when the last handle is released.
///
/// Handles are cloned and released only under the map lock, so the strong
/// count seen there is exact.
struct FlightGuard<'a> {
    flights: &'a Flights,
    key: &'a str,
    slot: Slot,
}

impl<'a> FlightGuard<'a> {
    fn join(flights: &'a Flights, key: &'a str) -> Self {
        let slot = Arc::clone(flights.lock().entry(key.to_string()).or_default());
        Self { flights, key, slot }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        let slot = std::mem::take(&mut self.slot);

        let ours = flights
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot));
        drop(slot);

        if ours
            && flights
                .get(self.key)
                .is_some_and(|current| Arc::strong_count(current) == 1)
        {
            flights.remove(self.key);
        }
    }
}

/// Read-through cache bound to tenant-tagged entries
#[derive(Clone)]
pub struct TenantCache {
    provider: Arc<dyn CacheProvider>,
    ttl: CacheTtlConfig,
    flights: Arc<Flights>,
}

impl std::fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCache")
            .field("ttl", &self.ttl)
            .field("in_flight", &self.flights.lock().len())
            .finish_non_exhaustive()
    }
}

impl TenantCache {
    #[must_use]
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: CacheTtlConfig) -> Self {
        Self {
            provider,
            ttl,
            flights: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub const fn ttl_config(&self) -> &CacheTtlConfig {
        &self.ttl
    }

    /// Number of keys with a computation currently in progress
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    pub async fn stats(&self) -> CacheStats {
        self.provider.stats().await
    }

    pub async fn health_check(&self) -> Result<()> {
        Ok(self.provider.health_check().await?)
    }

    /// Return the cached value for `parts`, or compute, store and return it.
    ///
    /// `tags` must be built for the same tenant selector as `parts`. A failed
    /// computation is returned as [`Error::CacheComputeFailure`] and nothing is
    /// stored, so the next caller computes again.
    pub async fn cached<T, F, Fut>(
        &self,
        parts: &KeyParts,
        ttl: Duration,
        tags: &TagSet,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if parts.selector() != tags.selector() {
            let violation = Violation::new(
                ViolationKind::CacheTagMismatch,
                ContextSnapshot::detached(parts.selector()),
            )
            .attempted(tags.selector().tenant().cloned());
            return Err(Error::violation(violation));
        }

        let key = parts.build();

        if let Some(value) = self.lookup(&key).await {
            record_lookup("hit");
            return Ok(value);
        }

        let guard = FlightGuard::join(&self.flights, key.as_str());
        let mut computed = guard.slot.lock().await;

        if let Some(bytes) = computed.as_deref()
            && let Ok(value) = serde_json::from_slice(bytes)
        {
            tracing::debug!(cache.key = %key, "joined in-flight computation");
            record_lookup("coalesced");
            return Ok(value);
        }

        record_lookup("miss");
        let value = match compute().await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(cache.key = %key, error = %e, "cache compute failed");
                record_lookup("compute_failure");
                return Err(Error::CacheComputeFailure(Box::new(e)));
            }
        };

        let bytes = serde_json::to_vec(&value)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        if let Err(e) = self.provider.set(&key, &bytes, tags, Some(ttl)).await {
            tracing::warn!(cache.key = %key, error = %e, "failed to store computed value");
        }
        *computed = Some(bytes);

        Ok(value)
    }

    /// Cached read of `kind` for the context's effective tenant.
    ///
    /// Builds the key from the context, tags the entry with the tenant's
    /// resource tag and uses the TTL configured for `kind`. The compute
    /// closure gets the tenant selector it must scope its queries to.
    pub async fn cached_resource<T, S, F, Fut>(
        &self,
        ctx: &ResolvedContext,
        kind: EntityKind,
        operation: &str,
        params: &[S],
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        S: AsRef<str>,
        F: FnOnce(TenantSelector) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let selector = ctx.effective_tenant().clone();
        let parts = KeyParts::for_context(ctx, operation).params(params);
        let tags = build_tags(&selector, kind);
        let ttl = self.ttl.for_kind(kind);

        self.cached(&parts, ttl, &tags, move || compute(selector))
            .await
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = match self.provider.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(cache.key = %key, error = %e, "cache read failed, computing");
                return None;
            }
        };

        if !entry.tags.is_owned_by(key.selector()) {
            record_violation(
                &Violation::new(
                    ViolationKind::ForeignCacheEntry,
                    ContextSnapshot::detached(key.selector()),
                )
                .attempted(entry.tags.selector().tenant().cloned()),
            );
            let _ = self.provider.delete(key).await;
            return None;
        }

        match serde_json::from_slice(&entry.value)
            .map_err(|e| CacheError::Deserialization(e.to_string()))
        {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(cache.key = %key, error = %e, "dropping undecodable cache entry");
                let _ = self.provider.delete(key).await;
                None
            }
        }
    }

    /// Drop every entry carrying `tag`
    pub async fn invalidate_tag(&self, tag: &Tag) -> Result<u64> {
        let removed = self.provider.invalidate_tag(tag).await?;
        tracing::debug!(cache.tag = %tag, removed, "invalidated tag");
        record_invalidation(removed);
        Ok(removed)
    }

    /// Invalidate several tags concurrently. Returns the total removed.
    pub async fn invalidate_tags(&self, tags: &[Tag]) -> Result<u64> {
        let results = join_all(tags.iter().map(|tag| self.invalidate_tag(tag))).await;
        results
            .into_iter()
            .try_fold(0u64, |total, removed| Ok(total + removed?))
    }

    /// Invalidate one resource kind of one tenant. Other tenants' entries for
    /// the same kind are untouched.
    pub async fn invalidate_resource(
        &self,
        selector: &TenantSelector,
        kind: EntityKind,
    ) -> Result<u64> {
        self.invalidate_tag(&Tag::resource(selector, kind)).await
    }

    /// Invalidate every cached copy of a tenant-independent entity
    pub async fn invalidate_catalog<E: TenantIndependent>(&self) -> Result<u64> {
        self.invalidate_tag(&Tag::catalog::<E>()).await
    }

    /// Sweep every entry cached for an admin-wide context
    pub async fn invalidate_admin_wide(&self) -> Result<u64> {
        self.invalidate_tag(&Tag::admin_wide()).await
    }

    /// Drop everything cached for one tenant
    pub async fn purge_tenant(&self, tenant: &TenantId) -> Result<u64> {
        self.invalidate_tag(&Tag::owner(&TenantSelector::Tenant(tenant.clone())))
            .await
    }

    /// Tags a committed write to `kind` of `tenant` must invalidate: the
    /// tenant's own resource tag and the admin-wide view of the same kind.
    #[must_use]
    pub fn write_tags(tenant: &TenantId, kind: EntityKind) -> Vec<Tag> {
        vec![
            Tag::resource(&TenantSelector::Tenant(tenant.clone()), kind),
            Tag::resource(&TenantSelector::AdminWide, kind),
        ]
    }

    /// Run the invalidation on a background task. Failures are logged.
    pub fn spawn_invalidation(&self, tags: Vec<Tag>) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.invalidate_tags(&tags).await {
                tracing::warn!(error = %e, tag_count = tags.len(), "background invalidation failed");
            }
        })
    }
}

#[cfg(feature = "metrics")]
fn record_lookup(outcome: &'static str) {
    crate::observability::record_cache_lookup(outcome);
}

#[cfg(not(feature = "metrics"))]
const fn record_lookup(_outcome: &'static str) {}

#[cfg(feature = "metrics")]
fn record_invalidation(removed: u64) {
    crate::observability::record_cache_invalidation(removed);
}

#[cfg(not(feature = "metrics"))]
const fn record_invalidation(_removed: u64) {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::{InMemoryCache, NoopCache};
    use crate::query::entities::Plan;
    use crate::tenant::{
        Principal, Role, TenancyConfig, TenantHints, TenantOverride, TenantResolver,
    };

    const NO_PARAMS: &[&str] = &[];

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn memory_cache() -> TenantCache {
        TenantCache::new(Arc::new(InMemoryCache::new()), CacheTtlConfig::default())
    }

    fn crew_context(yacht: &str) -> ResolvedContext {
        let principal = Principal::new("crew-1", Role::Crew).with_home_tenant(tenant(yacht));
        TenantResolver::new(&TenancyConfig::default())
            .resolve(principal, &TenantHints::none())
            .unwrap()
    }

    fn admin_context() -> ResolvedContext {
        TenantResolver::new(&TenancyConfig::default())
            .resolve(
                Principal::new("root", Role::SuperAdmin),
                &TenantHints::none().with_override(TenantOverride::AdminWide),
            )
            .unwrap()
    }

    async fn read_tasks(
        cache: &TenantCache,
        ctx: &ResolvedContext,
        calls: &AtomicUsize,
        value: &str,
    ) -> Vec<String> {
        let value = value.to_string();
        cache
            .cached_resource(ctx, EntityKind::Task, "list_tasks", &["open"], |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![value])
            })
            .await
            .unwrap()
    }

    async fn read_plans(cache: &TenantCache, ctx: &ResolvedContext, calls: &AtomicUsize) {
        let _: Vec<String> = cache
            .cached_resource(ctx, EntityKind::Plan, "list_plans", NO_PARAMS, |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![String::from("basic")])
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-1");
        let calls = &AtomicUsize::new(0);

        assert_eq!(read_tasks(&cache, &ctx, calls, "a").await, vec!["a"]);
        assert_eq!(read_tasks(&cache, &ctx, calls, "b").await, vec!["a"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_compute_receives_effective_tenant() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-4");

        let seen: String = cache
            .cached_resource(&ctx, EntityKind::Expense, "echo", NO_PARAMS, |selector| async move {
                Ok(selector.label().to_string())
            })
            .await
            .unwrap();

        assert_eq!(seen, "yacht-4");
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let providers: [Arc<dyn CacheProvider>; 2] =
            [Arc::new(InMemoryCache::new()), Arc::new(NoopCache::new())];

        for provider in providers {
            let cache = TenantCache::new(provider, CacheTtlConfig::default());
            let ctx = crew_context("yacht-3");
            let calls = &AtomicUsize::new(0);

            let compute = || {
                cache.cached_resource(&ctx, EntityKind::Task, "list_tasks", &["open"], |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(uuid::Uuid::new_v4().to_string())
                })
            };

            let (a, b): (Result<String>, Result<String>) = tokio::join!(compute(), compute());

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(a.unwrap(), b.unwrap());
            assert_eq!(cache.in_flight(), 0);
        }
    }

    #[test]
    fn test_flight_slot_released_by_last_holder() {
        let flights = Flights::default();
        let first = FlightGuard::join(&flights, "k");
        let second = FlightGuard::join(&flights, "k");
        assert!(Arc::ptr_eq(&first.slot, &second.slot));

        drop(first);
        assert_eq!(flights.lock().len(), 1);
        drop(second);
        assert!(flights.lock().is_empty());

        // A fresh flight after release gets a fresh, empty slot
        let third = FlightGuard::join(&flights, "k");
        assert!(third.slot.try_lock().unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contended_flights_leave_no_slots() {
        let cache = memory_cache();
        let ctx = Arc::new(crew_context("yacht-8"));

        for round in 0..50_u32 {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = cache.clone();
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        cache
                            .cached_resource(&ctx, EntityKind::Task, "count", NO_PARAMS, |_| async move {
                                tokio::task::yield_now().await;
                                Ok(round)
                            })
                            .await
                    })
                })
                .collect();

            for handle in handles {
                assert_eq!(handle.await.unwrap().unwrap(), round);
            }
            assert_eq!(cache.in_flight(), 0);
            cache
                .invalidate_resource(ctx.effective_tenant(), EntityKind::Task)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_different_tenants_do_not_coalesce() {
        let cache = memory_cache();
        let ctx1 = crew_context("yacht-1");
        let ctx2 = crew_context("yacht-2");
        let calls = &AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            read_tasks(&cache, &ctx1, calls, "one"),
            read_tasks(&cache, &ctx2, calls, "two"),
        );

        assert_eq!(a, vec!["one"]);
        assert_eq!(b, vec!["two"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_compute_failure_not_cached() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-1");
        let calls = &AtomicUsize::new(0);

        let err = cache
            .cached_resource::<Vec<String>, _, _, _>(
                &ctx,
                EntityKind::Task,
                "list_tasks",
                &["open"],
                |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::ResourceNotFound)
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_compute_failure());
        assert!(err.root().is_not_found());

        assert_eq!(read_tasks(&cache, &ctx, calls, "fresh").await, vec!["fresh"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_invalidates_only_own_tenant() {
        let cache = memory_cache();
        let ctx1 = crew_context("yacht-1");
        let ctx2 = crew_context("yacht-2");
        let calls = &AtomicUsize::new(0);

        read_tasks(&cache, &ctx1, calls, "t1-old").await;
        read_tasks(&cache, &ctx2, calls, "t2-old").await;

        let removed = cache
            .invalidate_resource(ctx1.effective_tenant(), EntityKind::Task)
            .await
            .unwrap();
        assert_eq!(removed, 1);

        assert_eq!(read_tasks(&cache, &ctx1, calls, "t1-new").await, vec!["t1-new"]);
        assert_eq!(read_tasks(&cache, &ctx2, calls, "t2-new").await, vec!["t2-old"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalidation_is_idempotent() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-1");
        let calls = &AtomicUsize::new(0);
        read_tasks(&cache, &ctx, calls, "a").await;

        let tag = Tag::resource(ctx.effective_tenant(), EntityKind::Task);
        assert_eq!(cache.invalidate_tag(&tag).await.unwrap(), 1);
        let after_once = cache.stats().await.entry_count;
        assert_eq!(cache.invalidate_tag(&tag).await.unwrap(), 0);
        assert_eq!(cache.stats().await.entry_count, after_once);
    }

    #[tokio::test]
    async fn test_tag_selector_mismatch_rejected() {
        let cache = memory_cache();
        let parts = KeyParts::new(
            TenantSelector::Tenant(tenant("yacht-1")),
            Role::Crew,
            "u1",
            "list_tasks",
        );
        let tags = build_tags(&TenantSelector::Tenant(tenant("yacht-2")), EntityKind::Task);

        let err = cache
            .cached(&parts, Duration::from_secs(30), &tags, || async { Ok(1u32) })
            .await
            .unwrap_err();

        let violation = err.as_violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::CacheTagMismatch);
        assert_eq!(violation.attempted_tenant_id, Some(tenant("yacht-2")));
    }

    #[tokio::test]
    async fn test_foreign_entry_is_never_served() {
        let provider = Arc::new(InMemoryCache::new());
        let cache = TenantCache::new(provider.clone(), CacheTtlConfig::default());
        let t1 = TenantSelector::Tenant(tenant("yacht-1"));
        let parts = KeyParts::new(t1.clone(), Role::Crew, "u1", "list_tasks");

        let poisoned = build_tags(&TenantSelector::Tenant(tenant("yacht-2")), EntityKind::Task);
        provider
            .set(&parts.build(), b"\"leak\"", &poisoned, None)
            .await
            .unwrap();

        let own_tags = build_tags(&t1, EntityKind::Task);
        let value: String = cache
            .cached(&parts, Duration::from_secs(30), &own_tags, || async {
                Ok(String::from("own"))
            })
            .await
            .unwrap();
        assert_eq!(value, "own");
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_recomputed() {
        let provider = Arc::new(InMemoryCache::new());
        let cache = TenantCache::new(provider.clone(), CacheTtlConfig::default());
        let t1 = TenantSelector::Tenant(tenant("yacht-1"));
        let parts = KeyParts::new(t1.clone(), Role::Crew, "u1", "count_tasks");
        let tags = build_tags(&t1, EntityKind::Task);

        provider
            .set(&parts.build(), b"not json", &tags, None)
            .await
            .unwrap();

        let value: u32 = cache
            .cached(&parts, Duration::from_secs(30), &tags, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let entry = provider.get(&parts.build()).await.unwrap().unwrap();
        assert_eq!(entry.value, b"7");
    }

    #[tokio::test]
    async fn test_admin_wide_sweep_and_catalog() {
        let cache = memory_cache();
        let admin = admin_context();
        let crew = crew_context("yacht-1");
        let calls = &AtomicUsize::new(0);
        assert_eq!(admin.effective_tenant(), &TenantSelector::AdminWide);

        read_plans(&cache, &admin, calls).await;
        read_plans(&cache, &crew, calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(cache.invalidate_admin_wide().await.unwrap(), 1);
        read_plans(&cache, &crew, calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        read_plans(&cache, &admin, calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert_eq!(cache.invalidate_catalog::<Plan>().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_purge_tenant() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-5");
        let calls = &AtomicUsize::new(0);
        read_tasks(&cache, &ctx, calls, "a").await;

        assert_eq!(cache.purge_tenant(&tenant("yacht-5")).await.unwrap(), 1);
        assert_eq!(cache.purge_tenant(&tenant("yacht-5")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_invalidation() {
        let cache = memory_cache();
        let ctx = crew_context("yacht-1");
        let calls = &AtomicUsize::new(0);
        read_tasks(&cache, &ctx, calls, "a").await;

        cache
            .spawn_invalidation(TenantCache::write_tags(&tenant("yacht-1"), EntityKind::Task))
            .await
            .unwrap();

        assert_eq!(read_tasks(&cache, &ctx, calls, "b").await, vec!["b"]);
    }
}
