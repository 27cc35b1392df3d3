//! Scoped and unscoped data accessors
//!
//! [`ScopedAccessor`] is the request-path entry point and derives the tenant
//! from a [`ResolvedContext`]. [`UnscopedAccessor`] is for cache compute
//! closures only and takes the tenant selector as an explicit argument.

mod scoped;
mod unscoped;

pub use scoped::ScopedAccessor;
pub use unscoped::UnscopedAccessor;

use crate::audit::{Violation, ViolationKind};
use crate::error::{Error, Result};
use crate::query::{EntityKind, Scope};
use crate::store::{RecordId, Store};
use crate::tenant::{ResolvedContext, TenantId};

/// `Some(attempted)` when a payload names a tenant other than `tenant`.
///
/// An unparseable claim still counts as a mismatch, with no attempted id.
fn claimed_tenant_mismatch(claimed: Option<&str>, tenant: &TenantId) -> Option<Option<TenantId>> {
    let claimed = claimed?;
    if claimed == tenant.as_str() {
        return None;
    }
    Some(TenantId::new(claimed).ok())
}

/// Read-before-write ownership check
async fn ensure_record_owned(
    store: &dyn Store,
    ctx: &ResolvedContext,
    tenant: &TenantId,
    kind: EntityKind,
    id: &RecordId,
) -> Result<()> {
    match store.owner_of(kind, id).await? {
        None => Err(Error::ResourceNotFound),
        Some(Scope::Tenant(owner)) if &owner == tenant => Ok(()),
        Some(owner) => Err(Error::violation(
            Violation::new(ViolationKind::CrossTenantWrite, ctx.snapshot())
                .attempted(owner.tenant().cloned()),
        )),
    }
}
