//! Effective tenant resolution

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::context::ResolvedContext;
use super::id::{TenantId, TenantSelector};
use super::principal::{Principal, Role};
use crate::error::{Error, Result};

/// Tenancy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Roles allowed to override their tenant or act admin-wide
    pub admin_roles: BTreeSet<Role>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            admin_roles: BTreeSet::from([Role::SuperAdmin]),
        }
    }
}

/// Tenant requested explicitly by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantOverride {
    Tenant(TenantId),
    AdminWide,
}

/// Optional inputs besides the principal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantHints {
    pub override_tenant: Option<TenantOverride>,
    pub route_hint: Option<TenantId>,
}

impl TenantHints {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_override(mut self, tenant: TenantOverride) -> Self {
        self.override_tenant = Some(tenant);
        self
    }

    #[must_use]
    pub fn with_route_hint(mut self, tenant: TenantId) -> Self {
        self.route_hint = Some(tenant);
        self
    }
}

/// Computes the effective tenant of a request.
///
/// Precedence: explicit override, then route hint (both honored only for
/// cross-tenant admin roles), then the principal's home tenant. Resolution
/// is pure; callers log the outcome.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    admin_roles: BTreeSet<Role>,
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new(&TenancyConfig::default())
    }
}

impl TenantResolver {
    #[must_use]
    pub fn new(config: &TenancyConfig) -> Self {
        Self {
            admin_roles: config.admin_roles.clone(),
        }
    }

    #[must_use]
    pub fn is_cross_tenant_admin(&self, role: Role) -> bool {
        self.admin_roles.contains(&role)
    }

    pub fn resolve(&self, principal: Principal, hints: &TenantHints) -> Result<ResolvedContext> {
        let requested = hints
            .override_tenant
            .clone()
            .or_else(|| hints.route_hint.clone().map(TenantOverride::Tenant));

        let effective = match requested {
            Some(TenantOverride::Tenant(id)) if self.is_cross_tenant_admin(principal.role()) => {
                TenantSelector::Tenant(id)
            }
            Some(TenantOverride::AdminWide) if self.is_cross_tenant_admin(principal.role()) => {
                TenantSelector::AdminWide
            }
            _ => principal
                .home_tenant_id()
                .cloned()
                .map(TenantSelector::Tenant)
                .ok_or(Error::NoTenantAssigned)?,
        };

        Ok(ResolvedContext::new(principal, effective))
    }
}

/// Resolve with the default admin role set
pub fn resolve_tenant(principal: Principal, hints: &TenantHints) -> Result<ResolvedContext> {
    TenantResolver::default().resolve(principal, hints)
}
