//! Request-path data access

use std::sync::Arc;

use super::{claimed_tenant_mismatch, ensure_record_owned};
use crate::audit::{Violation, ViolationKind};
use crate::error::{Error, Result};
use crate::query::{
    CreateSpec, DeleteSpec, QuerySpec, TenantIndependent, TenantOwned, UpdateSpec,
};
use crate::store::{Record, RecordId, Store};
use crate::tenant::{ExecutionMode, ResolvedContext, TenantId};

/// Data accessor that binds every operation to the request's resolved tenant.
///
/// Reads are filtered by the effective tenant, so another tenant's record is
/// reported as [`Error::ResourceNotFound`]. Updates and deletes check the target
/// record's owner first and fail with [`Error::TenantIsolationViolation`] on
/// mismatch. Holds only a store handle and may be shared freely.
#[derive(Clone)]
pub struct ScopedAccessor {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for ScopedAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedAccessor").finish_non_exhaustive()
    }
}

impl ScopedAccessor {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn find<E: TenantOwned>(
        &self,
        ctx: &ResolvedContext,
        spec: QuerySpec<E>,
    ) -> Result<Vec<Record>> {
        let tenant = ctx.require_tenant()?;
        let query = spec.for_tenant(tenant);

        tracing::debug!(
            tenant.id = %tenant,
            entity = %query.kind(),
            "scoped find"
        );

        Ok(self.store.select(&query).await?)
    }

    /// Single record by id; absent and foreign records are indistinguishable
    pub async fn get<E: TenantOwned>(&self, ctx: &ResolvedContext, id: RecordId) -> Result<Record> {
        self.find(ctx, QuerySpec::<E>::by_id(id).limit(1))
            .await?
            .pop()
            .ok_or(Error::ResourceNotFound)
    }

    /// Read a tenant-independent entity; allowed for any resolved context
    pub async fn find_global<E: TenantIndependent>(
        &self,
        ctx: &ResolvedContext,
        spec: QuerySpec<E>,
    ) -> Result<Vec<Record>> {
        let query = spec.global();

        tracing::debug!(
            tenant.effective = %ctx.effective_tenant(),
            entity = %query.kind(),
            "scoped global find"
        );

        Ok(self.store.select(&query).await?)
    }

    pub async fn create<E: TenantOwned>(
        &self,
        ctx: &ResolvedContext,
        spec: CreateSpec<E>,
    ) -> Result<Record> {
        let tenant = ctx.require_tenant()?;

        if let Some(attempted) = claimed_tenant_mismatch(spec.claimed_tenant(), tenant) {
            return Err(Error::violation(
                Violation::new(ViolationKind::CrossTenantCreate, ctx.snapshot())
                    .attempted(attempted),
            ));
        }

        let record = self.store.insert(spec.for_tenant(tenant)).await?;
        tracing::debug!(tenant.id = %tenant, record.id = %record.id, "scoped create");
        Ok(record)
    }

    /// Create a tenant-independent record; admin-wide contexts only
    pub async fn create_global<E: TenantIndependent>(
        &self,
        ctx: &ResolvedContext,
        spec: CreateSpec<E>,
    ) -> Result<Record> {
        ensure_admin_wide(ctx)?;
        Ok(self.store.insert(spec.global()).await?)
    }

    /// Update a tenant-independent record; admin-wide contexts only
    pub async fn update_global<E: TenantIndependent>(
        &self,
        ctx: &ResolvedContext,
        spec: UpdateSpec<E>,
    ) -> Result<Record> {
        ensure_admin_wide(ctx)?;

        // A global record never acquires an owner
        if let Some(claimed) = spec.claimed_tenant() {
            return Err(Error::violation(
                Violation::new(ViolationKind::CrossTenantWrite, ctx.snapshot())
                    .attempted(TenantId::new(claimed).ok()),
            ));
        }

        let (id, changes) = spec.into_parts();
        let query = QuerySpec::<E>::by_id(id).global();

        let updated = self.store.update(&query, &changes).await?;
        tracing::debug!(entity = %query.kind(), rows = updated.len(), "scoped global update");
        updated.into_iter().next().ok_or(Error::ResourceNotFound)
    }

    /// Delete a tenant-independent record; admin-wide contexts only
    pub async fn delete_global<E: TenantIndependent>(
        &self,
        ctx: &ResolvedContext,
        spec: DeleteSpec<E>,
    ) -> Result<()> {
        ensure_admin_wide(ctx)?;

        let query = QuerySpec::<E>::by_id(spec.into_id()).global();
        match self.store.delete(&query).await? {
            0 => Err(Error::ResourceNotFound),
            _ => Ok(()),
        }
    }

    pub async fn update<E: TenantOwned>(
        &self,
        ctx: &ResolvedContext,
        spec: UpdateSpec<E>,
    ) -> Result<Record> {
        let tenant = ctx.require_tenant()?;
        ensure_record_owned(self.store.as_ref(), ctx, tenant, E::KIND, spec.id()).await?;

        if let Some(attempted) = claimed_tenant_mismatch(spec.claimed_tenant(), tenant) {
            return Err(Error::violation(
                Violation::new(ViolationKind::CrossTenantWrite, ctx.snapshot())
                    .attempted(attempted),
            ));
        }

        let (id, changes) = spec.into_parts();
        let query = QuerySpec::<E>::by_id(id).for_tenant(tenant);

        // Deleted between the owner check and the write
        let updated = self.store.update(&query, &changes).await?;
        updated.into_iter().next().ok_or(Error::ResourceNotFound)
    }

    pub async fn delete<E: TenantOwned>(
        &self,
        ctx: &ResolvedContext,
        spec: DeleteSpec<E>,
    ) -> Result<()> {
        let tenant = ctx.require_tenant()?;
        ensure_record_owned(self.store.as_ref(), ctx, tenant, E::KIND, spec.id()).await?;

        let query = QuerySpec::<E>::by_id(spec.into_id()).for_tenant(tenant);
        match self.store.delete(&query).await? {
            0 => Err(Error::ResourceNotFound),
            _ => Ok(()),
        }
    }
}

fn ensure_admin_wide(ctx: &ResolvedContext) -> Result<()> {
    if ctx.mode() == ExecutionMode::AdminWide {
        return Ok(());
    }

    Err(Error::violation(Violation::new(
        ViolationKind::GlobalWriteDenied,
        ctx.snapshot(),
    )))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::entities::{Plan, Task};
    use crate::store::{FieldMap, InMemoryStore};
    use crate::tenant::{Principal, Role, TenantHints, TenantOverride, resolve_tenant};

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn crew(home: &str) -> ResolvedContext {
        let principal = Principal::new("crew-1", Role::Crew).with_home_tenant(tenant(home));
        resolve_tenant(principal, &TenantHints::none()).unwrap()
    }

    fn admin_wide() -> ResolvedContext {
        let hints = TenantHints::none().with_override(TenantOverride::AdminWide);
        resolve_tenant(Principal::new("root", Role::SuperAdmin), &hints).unwrap()
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> (ScopedAccessor, RecordId) {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let id = RecordId::new("task-42");
        accessor
            .create(
                &crew("yacht-2"),
                CreateSpec::<Task>::new(fields(json!({"title": "Secret refit"}))).with_id(id.clone()),
            )
            .await
            .unwrap();
        (accessor, id)
    }

    #[tokio::test]
    async fn test_cross_tenant_get_is_not_found() {
        let (accessor, id) = seeded().await;
        let err = accessor.get::<Task>(&crew("yacht-1"), id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_owner_can_read() {
        let (accessor, id) = seeded().await;
        let record = accessor.get::<Task>(&crew("yacht-2"), id).await.unwrap();
        assert_eq!(record.field("title"), Some(&json!("Secret refit")));
        assert_eq!(record.tenant_id, Some(tenant("yacht-2")));
    }

    #[tokio::test]
    async fn test_find_only_returns_own_tenant() {
        let (accessor, _) = seeded().await;
        accessor
            .create(&crew("yacht-1"), CreateSpec::<Task>::new(fields(json!({"title": "Mine"}))))
            .await
            .unwrap();

        let rows = accessor
            .find(&crew("yacht-1"), QuerySpec::<Task>::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.tenant_id == Some(tenant("yacht-1"))));
    }

    #[tokio::test]
    async fn test_cross_tenant_update_is_violation() {
        let (accessor, id) = seeded().await;
        let spec = UpdateSpec::<Task>::new(id.clone(), fields(json!({"title": "pwned"})));
        let err = accessor.update(&crew("yacht-1"), spec).await.unwrap_err();

        let violation = err.as_violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::CrossTenantWrite);
        assert_eq!(violation.attempted_tenant_id, Some(tenant("yacht-2")));

        let untouched = accessor.get::<Task>(&crew("yacht-2"), id).await.unwrap();
        assert_eq!(untouched.field("title"), Some(&json!("Secret refit")));
    }

    #[tokio::test]
    async fn test_cross_tenant_delete_is_violation() {
        let (accessor, id) = seeded().await;
        let err = accessor
            .delete(&crew("yacht-1"), DeleteSpec::<Task>::new(id.clone()))
            .await
            .unwrap_err();
        assert!(err.is_isolation_violation());
        assert!(accessor.get::<Task>(&crew("yacht-2"), id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let (accessor, _) = seeded().await;
        let spec = UpdateSpec::<Task>::new(RecordId::new("task-404"), FieldMap::new());
        let err = accessor.update(&crew("yacht-1"), spec).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_then_read_is_consistent() {
        let (accessor, id) = seeded().await;
        let ctx = crew("yacht-2");
        let updated = accessor
            .update(
                &ctx,
                UpdateSpec::<Task>::new(id.clone(), fields(json!({"status": "done"}))),
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let read = accessor.get::<Task>(&ctx, id).await.unwrap();
        assert_eq!(read.field("status"), Some(&json!("done")));
    }

    #[tokio::test]
    async fn test_update_cannot_move_record_to_other_tenant() {
        let (accessor, id) = seeded().await;
        let spec = UpdateSpec::<Task>::new(id, fields(json!({"tenant_id": "yacht-1"})));
        let err = accessor.update(&crew("yacht-2"), spec).await.unwrap_err();
        assert_eq!(
            err.as_violation().map(|v| v.kind),
            Some(ViolationKind::CrossTenantWrite)
        );
    }

    #[tokio::test]
    async fn test_create_with_foreign_tenant_claim_is_violation() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let spec = CreateSpec::<Task>::new(fields(json!({"tenant_id": "yacht-2", "title": "x"})));
        let err = accessor.create(&crew("yacht-1"), spec).await.unwrap_err();
        assert_eq!(
            err.as_violation().map(|v| v.kind),
            Some(ViolationKind::CrossTenantCreate)
        );
    }

    #[tokio::test]
    async fn test_create_with_matching_claim_is_accepted() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let spec = CreateSpec::<Task>::new(fields(json!({"tenant_id": "yacht-1", "title": "x"})));
        let record = accessor.create(&crew("yacht-1"), spec).await.unwrap();
        assert_eq!(record.tenant_id, Some(tenant("yacht-1")));
        assert!(record.field("tenant_id").is_none());
    }

    #[tokio::test]
    async fn test_admin_wide_cannot_touch_tenant_owned() {
        let (accessor, id) = seeded().await;
        let ctx = admin_wide();
        assert!(
            accessor
                .find(&ctx, QuerySpec::<Task>::new())
                .await
                .unwrap_err()
                .is_no_tenant()
        );
        assert!(accessor.get::<Task>(&ctx, id).await.unwrap_err().is_no_tenant());
    }

    #[tokio::test]
    async fn test_global_writes_need_admin_wide() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let plan = || CreateSpec::<Plan>::new(fields(json!({"name": "Fleet"})));

        let err = accessor.create_global(&crew("yacht-1"), plan()).await.unwrap_err();
        assert_eq!(
            err.as_violation().map(|v| v.kind),
            Some(ViolationKind::GlobalWriteDenied)
        );

        accessor.create_global(&admin_wide(), plan()).await.unwrap();
        let plans = accessor
            .find_global(&crew("yacht-1"), QuerySpec::<Plan>::new())
            .await
            .unwrap();
        assert_eq!(plans.len(), 1);
    }

    #[tokio::test]
    async fn test_global_update_and_delete_need_admin_wide() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let admin = admin_wide();
        let plan = accessor
            .create_global(
                &admin,
                CreateSpec::<Plan>::new(fields(json!({"name": "Fleet", "seats": 5}))),
            )
            .await
            .unwrap();
        assert_eq!(plan.tenant_id, None);

        let rename = || UpdateSpec::<Plan>::new(plan.id.clone(), fields(json!({"name": "Armada"})));
        let err = accessor.update_global(&crew("yacht-1"), rename()).await.unwrap_err();
        assert_eq!(
            err.as_violation().map(|v| v.kind),
            Some(ViolationKind::GlobalWriteDenied)
        );
        let err = accessor
            .delete_global(&crew("yacht-1"), DeleteSpec::<Plan>::new(plan.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(
            err.as_violation().map(|v| v.kind),
            Some(ViolationKind::GlobalWriteDenied)
        );

        let updated = accessor.update_global(&admin, rename()).await.unwrap();
        assert_eq!(updated.field("name"), Some(&json!("Armada")));
        assert_eq!(updated.version, 2);
        assert_eq!(updated.tenant_id, None);

        accessor
            .delete_global(&admin, DeleteSpec::<Plan>::new(plan.id.clone()))
            .await
            .unwrap();
        let plans = accessor
            .find_global(&crew("yacht-1"), QuerySpec::<Plan>::new())
            .await
            .unwrap();
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn test_global_write_to_missing_record_is_not_found() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let admin = admin_wide();
        let missing = RecordId::new("plan-404");

        let err = accessor
            .update_global(&admin, UpdateSpec::<Plan>::new(missing.clone(), FieldMap::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = accessor
            .delete_global(&admin, DeleteSpec::<Plan>::new(missing))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_global_update_cannot_assign_tenant() {
        let accessor = ScopedAccessor::new(Arc::new(InMemoryStore::new()));
        let admin = admin_wide();
        let plan = accessor
            .create_global(&admin, CreateSpec::<Plan>::new(fields(json!({"name": "Fleet"}))))
            .await
            .unwrap();

        let spec = UpdateSpec::<Plan>::new(plan.id, fields(json!({"tenant_id": "yacht-1"})));
        let err = accessor.update_global(&admin, spec).await.unwrap_err();
        let violation = err.as_violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::CrossTenantWrite);
        assert_eq!(violation.attempted_tenant_id, Some(tenant("yacht-1")));
    }
}
