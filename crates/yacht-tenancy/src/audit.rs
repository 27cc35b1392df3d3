//! Isolation violation records and audit logging
//!
//! A [`Violation`] carries the resolved context of the offending request and, when
//! known, the tenant it tried to reach. It never carries the foreign record's data.

use std::fmt;

use serde::Serialize;

use crate::tenant::{ContextSnapshot, TenantId};

/// Category of an isolation violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Update or delete of a record owned by another tenant
    CrossTenantWrite,
    /// Create whose payload names a different tenant
    CrossTenantCreate,
    /// Write to a tenant-independent entity without admin-wide scope
    GlobalWriteDenied,
    /// Explicit selector disagrees with the tenant folded into the query
    SelectorMismatch,
    /// Cache tags built for a different tenant than the cache key
    CacheTagMismatch,
    /// Cached entry lacked the reader's owner tag
    ForeignCacheEntry,
}

impl ViolationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrossTenantWrite => "cross_tenant_write",
            Self::CrossTenantCreate => "cross_tenant_create",
            Self::GlobalWriteDenied => "global_write_denied",
            Self::SelectorMismatch => "selector_mismatch",
            Self::CacheTagMismatch => "cache_tag_mismatch",
            Self::ForeignCacheEntry => "foreign_cache_entry",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of an attempted tenant boundary crossing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub context: ContextSnapshot,
    pub attempted_tenant_id: Option<TenantId>,
}

impl Violation {
    #[must_use]
    pub const fn new(kind: ViolationKind, context: ContextSnapshot) -> Self {
        Self {
            kind,
            context,
            attempted_tenant_id: None,
        }
    }

    #[must_use]
    pub fn attempted(mut self, tenant: Option<TenantId>) -> Self {
        self.attempted_tenant_id = tenant;
        self
    }
}

// Display stays generic: it can end up in error chains and dev-mode responses.
impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Emit a violation to the `audit` log target
pub fn record_violation(violation: &Violation) {
    tracing::event!(
        target: "audit",
        tracing::Level::WARN,
        violation.kind = violation.kind.as_str(),
        principal.id = violation.context.principal_id.as_deref().unwrap_or("-"),
        principal.role = violation.context.role.map_or("-", |r| r.as_str()),
        tenant.effective = %violation.context.effective_tenant,
        tenant.attempted = violation.attempted_tenant_id.as_ref().map_or("-", TenantId::as_str),
        "tenant isolation violation"
    );

    #[cfg(feature = "metrics")]
    crate::observability::record_violation(violation.kind.as_str());
}
