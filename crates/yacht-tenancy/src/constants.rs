//! Constants shared across the tenancy layer

/// Reserved record field carrying the owning tenant
pub const TENANT_FIELD: &str = "tenant_id";

/// Reserved record field carrying the record id
pub const ID_FIELD: &str = "id";

/// Maximum length of a tenant identifier
pub const MAX_TENANT_ID_LEN: usize = 64;

/// Prefix for generated tenant identifiers
pub const TENANT_ID_PREFIX: &str = "yacht";

/// Selector label used for the cross-tenant admin marker
pub const ADMIN_WIDE: &str = "admin-wide";

/// Tag prefix marking the owning tenant of a cache entry
pub const OWNER_TAG_PREFIX: &str = "owner:";

/// Tag prefix for tenant-independent resources shared by all tenants
pub const CATALOG_TAG_PREFIX: &str = "catalog:";

/// Health status: success
pub const STATUS_OK: &str = "ok";

/// Health status: degraded
pub const STATUS_DEGRADED: &str = "degraded";

/// Request headers read by the header identity extractor
pub mod headers {
    pub const PRINCIPAL_ID: &str = "x-principal-id";
    pub const PRINCIPAL_ROLE: &str = "x-principal-role";
    pub const HOME_TENANT: &str = "x-home-tenant";
    pub const TENANT_OVERRIDE: &str = "x-tenant-override";
}
