//! Tenant resolution, isolation and cache consistency for the yacht operations platform

pub mod access;
pub mod audit;
pub mod cache;
pub mod config;
mod constants;
mod error;
pub mod observability;
pub mod query;
pub mod store;
pub mod tenant;
pub mod translate;
#[cfg(feature = "http")]
pub mod transport;

pub use access::{ScopedAccessor, UnscopedAccessor};
pub use audit::{Violation, ViolationKind};
pub use cache::{
    CacheBackend, CacheConfig, CacheError, CacheKey, CacheProvider, CacheResult, CacheStats,
    CacheTtlConfig, InMemoryCache, KeyParts, NoopCache, Tag, TagSet, TenantCache, TracedCache,
    build_key, build_tags, create_cache, create_tenant_cache,
};
pub use config::{Config, ConfigBuilder, Environment, TelemetryConfig};
pub use constants::{ADMIN_WIDE, TENANT_FIELD};
pub use error::{Error, Result};
pub use query::{CreateSpec, DeleteSpec, EntityKind, QuerySpec, UpdateSpec, entities};
pub use store::{InMemoryStore, Record, RecordId, Store, StoreError};
pub use tenant::{
    Principal, ResolvedContext, Role, TenancyConfig, TenantHints, TenantId, TenantOverride,
    TenantResolver, TenantSelector, resolve_tenant,
};
pub use translate::{ErrorBody, ErrorTranslator, TranslatedError};
