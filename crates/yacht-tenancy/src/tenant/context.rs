//! Per-request resolved tenant context

use serde::Serialize;

use super::id::{TenantId, TenantSelector};
use super::principal::{Principal, Role};
use crate::error::Result;

/// How a resolved request executes against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Every operation is bound to one tenant
    Scoped,
    /// Cross-tenant admin; only tenant-independent entities are reachable unscoped
    AdminWide,
}

/// Principal plus the tenant every operation of this request is confined to.
///
/// Produced only by [`TenantResolver`](super::TenantResolver). Not `Clone` and
/// not serializable: it lives for one request and is passed by reference.
#[derive(Debug)]
pub struct ResolvedContext {
    principal: Principal,
    effective_tenant: TenantSelector,
}

impl ResolvedContext {
    pub(super) const fn new(principal: Principal, effective_tenant: TenantSelector) -> Self {
        Self {
            principal,
            effective_tenant,
        }
    }

    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub const fn effective_tenant(&self) -> &TenantSelector {
        &self.effective_tenant
    }

    #[must_use]
    pub const fn tenant(&self) -> Option<&TenantId> {
        self.effective_tenant.tenant()
    }

    pub fn require_tenant(&self) -> Result<&TenantId> {
        self.effective_tenant.require_tenant()
    }

    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        match self.effective_tenant {
            TenantSelector::Tenant(_) => ExecutionMode::Scoped,
            TenantSelector::AdminWide => ExecutionMode::AdminWide,
        }
    }

    /// Audit view of this context
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            principal_id: Some(self.principal.id().to_string()),
            role: Some(self.principal.role()),
            effective_tenant: self.effective_tenant.label().to_string(),
        }
    }
}

/// Owned, loggable copy of the parts of a context relevant to auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    pub principal_id: Option<String>,
    pub role: Option<Role>,
    pub effective_tenant: String,
}

impl ContextSnapshot {
    /// Snapshot for code running outside a request (cache compute, background jobs)
    #[must_use]
    pub fn detached(selector: &TenantSelector) -> Self {
        Self {
            principal_id: None,
            role: None,
            effective_tenant: selector.label().to_string(),
        }
    }
}
