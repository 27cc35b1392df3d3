//! Typed query specifications
//!
//! A [`QuerySpec`] describes what to read; it cannot reach the store until it is
//! bound into a [`BoundQuery`]. Binding is only possible through
//! [`QuerySpec::for_tenant`] (tenant-owned entities, needs a [`TenantId`]) or
//! [`QuerySpec::global`] (tenant-independent entities), so forgetting the
//! tenant filter does not compile.

use std::fmt;
use std::marker::PhantomData;

use super::entity::{Entity, EntityKind, TenantIndependent, TenantOwned};
use super::predicate::{Condition, Predicate};
use crate::constants::{ID_FIELD, TENANT_FIELD};
use crate::store::{FieldMap, RecordId};
use crate::tenant::TenantId;

/// Tenant scope a bound operation runs under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Tenant(TenantId),
    /// Tenant-independent entity, visible to all tenants
    Global,
}

impl Scope {
    #[must_use]
    pub const fn tenant(&self) -> Option<&TenantId> {
        match self {
            Self::Tenant(id) => Some(id),
            Self::Global => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant(id) => write!(f, "tenant:{id}"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Unbound read description for entity `E`
pub struct QuerySpec<E: Entity> {
    predicate: Predicate,
    fields: Vec<String>,
    limit: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> fmt::Debug for QuerySpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("entity_kind", &E::KIND)
            .field("predicate", &self.predicate)
            .field("fields", &self.fields)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<E: Entity> Clone for QuerySpec<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            fields: self.fields.clone(),
            limit: self.limit,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Default for QuerySpec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> QuerySpec<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            predicate: Predicate::new(),
            fields: Vec::new(),
            limit: None,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn by_id(id: RecordId) -> Self {
        Self::new().filter(Condition::IdEq { id })
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.predicate = self.predicate.and(condition);
        self
    }

    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filter(Condition::eq(field, value))
    }

    #[must_use]
    pub fn select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn entity_kind(&self) -> EntityKind {
        E::KIND
    }

    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    fn bind(self, scope: Scope) -> BoundQuery {
        let predicate = match &scope {
            Scope::Tenant(tenant) => self.predicate.and(Condition::TenantEq {
                tenant: tenant.clone(),
            }),
            Scope::Global => self.predicate,
        };

        BoundQuery {
            kind: E::KIND,
            scope,
            predicate,
            fields: self.fields,
            limit: self.limit,
        }
    }
}

impl<E: TenantOwned> QuerySpec<E> {
    /// Conjoin the tenant into the predicate
    #[must_use]
    pub fn for_tenant(self, tenant: &TenantId) -> BoundQuery {
        self.bind(Scope::Tenant(tenant.clone()))
    }
}

impl<E: TenantIndependent> QuerySpec<E> {
    #[must_use]
    pub fn global(self) -> BoundQuery {
        self.bind(Scope::Global)
    }
}

/// Query ready for execution, with its tenant constraint already folded in
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    kind: EntityKind,
    scope: Scope,
    predicate: Predicate,
    fields: Vec<String>,
    limit: Option<usize>,
}

impl BoundQuery {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Generated predicate, tenant condition included
    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Split reserved keys off a payload, returning the claimed tenant if any
fn strip_reserved(mut fields: FieldMap) -> (FieldMap, Option<String>) {
    fields.remove(ID_FIELD);
    let claimed = fields.remove(TENANT_FIELD).map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });
    (fields, claimed)
}

/// Payload for a new record of entity `E`
pub struct CreateSpec<E: Entity> {
    id: Option<RecordId>,
    fields: FieldMap,
    claimed_tenant: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> fmt::Debug for CreateSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateSpec")
            .field("entity_kind", &E::KIND)
            .field("id", &self.id)
            .field("field_count", &self.fields.len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> CreateSpec<E> {
    #[must_use]
    pub fn new(fields: FieldMap) -> Self {
        let (fields, claimed_tenant) = strip_reserved(fields);
        Self {
            id: None,
            fields,
            claimed_tenant,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Tenant named in the payload's `tenant_id` field, if present
    #[must_use]
    pub fn claimed_tenant(&self) -> Option<&str> {
        self.claimed_tenant.as_deref()
    }

    fn bind(self, scope: Scope) -> NewRecord {
        NewRecord {
            id: self.id,
            kind: E::KIND,
            scope,
            fields: self.fields,
            claimed_tenant: self.claimed_tenant,
        }
    }
}

impl<E: TenantOwned> CreateSpec<E> {
    #[must_use]
    pub fn for_tenant(self, tenant: &TenantId) -> NewRecord {
        self.bind(Scope::Tenant(tenant.clone()))
    }
}

impl<E: TenantIndependent> CreateSpec<E> {
    #[must_use]
    pub fn global(self) -> NewRecord {
        self.bind(Scope::Global)
    }
}

/// Record ready for insertion, with its owning scope fixed
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    id: Option<RecordId>,
    kind: EntityKind,
    scope: Scope,
    fields: FieldMap,
    claimed_tenant: Option<String>,
}

impl NewRecord {
    #[must_use]
    pub const fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    #[must_use]
    pub fn claimed_tenant(&self) -> Option<&str> {
        self.claimed_tenant.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Option<RecordId>, EntityKind, Scope, FieldMap) {
        (self.id, self.kind, self.scope, self.fields)
    }
}

/// Changes to apply to one record of entity `E`
pub struct UpdateSpec<E: Entity> {
    id: RecordId,
    changes: FieldMap,
    claimed_tenant: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> fmt::Debug for UpdateSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateSpec")
            .field("entity_kind", &E::KIND)
            .field("id", &self.id)
            .field("change_count", &self.changes.len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> UpdateSpec<E> {
    #[must_use]
    pub fn new(id: RecordId, changes: FieldMap) -> Self {
        let (changes, claimed_tenant) = strip_reserved(changes);
        Self {
            id,
            changes,
            claimed_tenant,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    #[must_use]
    pub const fn changes(&self) -> &FieldMap {
        &self.changes
    }

    #[must_use]
    pub fn claimed_tenant(&self) -> Option<&str> {
        self.claimed_tenant.as_deref()
    }

    pub(crate) fn into_parts(self) -> (RecordId, FieldMap) {
        (self.id, self.changes)
    }
}

/// Deletion of one record of entity `E`
pub struct DeleteSpec<E: Entity> {
    id: RecordId,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> fmt::Debug for DeleteSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteSpec")
            .field("entity_kind", &E::KIND)
            .field("id", &self.id)
            .finish()
    }
}

impl<E: Entity> DeleteSpec<E> {
    #[must_use]
    pub const fn new(id: RecordId) -> Self {
        Self {
            id,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn into_id(self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::entities::{Plan, Task};

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_for_tenant_folds_constraint() {
        let query = QuerySpec::<Task>::new()
            .where_eq("status", "open")
            .for_tenant(&tenant("yacht-1"));

        assert_eq!(query.kind(), EntityKind::Task);
        assert_eq!(query.scope(), &Scope::Tenant(tenant("yacht-1")));
        let tenants: Vec<_> = query.predicate().tenant_constraints().collect();
        assert_eq!(tenants, vec![&tenant("yacht-1")]);
        assert_eq!(query.predicate().conditions().len(), 2);
    }

    #[test]
    fn test_global_adds_no_tenant_constraint() {
        let query = QuerySpec::<Plan>::new().limit(5).global();
        assert_eq!(query.scope(), &Scope::Global);
        assert_eq!(query.predicate().tenant_constraints().count(), 0);
        assert_eq!(query.limit(), Some(5));
    }

    #[test]
    fn test_by_id_and_select() {
        let query = QuerySpec::<Task>::by_id(RecordId::new("task-42"))
            .select(["title"])
            .for_tenant(&tenant("yacht-1"));
        assert!(
            query
                .predicate()
                .conditions()
                .contains(&Condition::IdEq {
                    id: RecordId::new("task-42")
                })
        );
        assert_eq!(query.fields(), ["title".to_string()]);
    }

    #[test]
    fn test_create_spec_strips_reserved_fields() {
        let spec = CreateSpec::<Task>::new(fields(json!({
            "id": "forged",
            "tenant_id": "yacht-2",
            "title": "Check bilge"
        })));
        assert_eq!(spec.claimed_tenant(), Some("yacht-2"));

        let record = spec.for_tenant(&tenant("yacht-1"));
        assert!(record.fields().get("tenant_id").is_none());
        assert!(record.fields().get("id").is_none());
        assert_eq!(record.scope(), &Scope::Tenant(tenant("yacht-1")));
        assert_eq!(record.claimed_tenant(), Some("yacht-2"));
    }

    #[test]
    fn test_update_spec_strips_reserved_fields() {
        let spec = UpdateSpec::<Task>::new(
            RecordId::new("task-1"),
            fields(json!({"status": "done", "tenant_id": "yacht-1"})),
        );
        assert_eq!(spec.claimed_tenant(), Some("yacht-1"));
        assert_eq!(spec.changes().len(), 1);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Tenant(tenant("yacht-1")).to_string(), "tenant:yacht-1");
        assert_eq!(Scope::Global.to_string(), "global");
    }
}
