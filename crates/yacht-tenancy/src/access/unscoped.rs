//! Context-free data access for cache compute closures

use std::sync::Arc;

use super::claimed_tenant_mismatch;
use crate::audit::{Violation, ViolationKind};
use crate::error::{Error, Result};
use crate::query::{BoundQuery, NewRecord, Scope};
use crate::store::{FieldMap, Record, Store};
use crate::tenant::{ContextSnapshot, TenantSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Escape hatch for code that runs without a [`ResolvedContext`].
///
/// Every call names its tenant selector explicitly and receives a query the
/// caller has already bound with `for_tenant` or `global`. The accessor only
/// checks that the two agree; it does no ownership lookups and consults no
/// request state. Use it inside `TenantCache` compute closures and nowhere on
/// the request path.
///
/// [`ResolvedContext`]: crate::tenant::ResolvedContext
#[derive(Clone)]
pub struct UnscopedAccessor {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for UnscopedAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnscopedAccessor").finish_non_exhaustive()
    }
}

impl UnscopedAccessor {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn find(&self, selector: &TenantSelector, query: BoundQuery) -> Result<Vec<Record>> {
        ensure_scope(selector, query.scope(), Access::Read)?;
        tracing::debug!(
            tenant.selector = %selector,
            scope = %query.scope(),
            entity = %query.kind(),
            "unscoped find"
        );
        Ok(self.store.select(&query).await?)
    }

    pub async fn create(&self, selector: &TenantSelector, record: NewRecord) -> Result<Record> {
        ensure_scope(selector, record.scope(), Access::Write)?;

        if let Scope::Tenant(tenant) = record.scope()
            && let Some(attempted) = claimed_tenant_mismatch(record.claimed_tenant(), tenant)
        {
            return Err(Error::violation(
                Violation::new(
                    ViolationKind::CrossTenantCreate,
                    ContextSnapshot::detached(selector),
                )
                .attempted(attempted),
            ));
        }

        Ok(self.store.insert(record).await?)
    }

    pub async fn update(
        &self,
        selector: &TenantSelector,
        query: BoundQuery,
        changes: FieldMap,
    ) -> Result<Vec<Record>> {
        ensure_scope(selector, query.scope(), Access::Write)?;
        Ok(self.store.update(&query, &changes).await?)
    }

    pub async fn delete(&self, selector: &TenantSelector, query: BoundQuery) -> Result<u64> {
        ensure_scope(selector, query.scope(), Access::Write)?;
        Ok(self.store.delete(&query).await?)
    }
}

fn ensure_scope(selector: &TenantSelector, scope: &Scope, access: Access) -> Result<()> {
    let allowed = match (selector, scope) {
        (TenantSelector::Tenant(expected), Scope::Tenant(bound)) => expected == bound,
        (TenantSelector::AdminWide, _) => true,
        (TenantSelector::Tenant(_), Scope::Global) => access == Access::Read,
    };

    if allowed {
        return Ok(());
    }

    let kind = match scope {
        Scope::Global => ViolationKind::GlobalWriteDenied,
        Scope::Tenant(_) => ViolationKind::SelectorMismatch,
    };

    Err(Error::violation(
        Violation::new(kind, ContextSnapshot::detached(selector)).attempted(scope.tenant().cloned()),
    ))
}
