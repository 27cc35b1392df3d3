//! In-memory store

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{StoreError, StoreResult};
use super::record::{FieldMap, Record, RecordId};
use super::{Store, StoreStats};
use crate::query::{BoundQuery, EntityKind, NewRecord, Scope};

#[derive(Default)]
struct Counters {
    reads: u64,
    writes: u64,
}

/// Thread-safe in-memory store, ordered by record id within each kind
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<EntityKind, BTreeMap<RecordId, Record>>>>,
    counters: Arc<RwLock<Counters>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count: usize = self.records.read().values().map(BTreeMap::len).sum();
        f.debug_struct("InMemoryStore")
            .field("record_count", &count)
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn select(&self, query: &BoundQuery) -> StoreResult<Vec<Record>> {
        let records = self.records.read();
        let limit = query.limit().unwrap_or(usize::MAX);

        let rows: Vec<Record> = records
            .get(&query.kind())
            .map(|table| {
                table
                    .values()
                    .filter(|r| query.predicate().matches(r))
                    .take(limit)
                    .map(|r| r.project(query.fields()))
                    .collect()
            })
            .unwrap_or_default();
        drop(records);

        self.counters.write().reads += 1;
        Ok(rows)
    }

    async fn insert(&self, record: NewRecord) -> StoreResult<Record> {
        let (id, kind, scope, fields) = record.into_parts();
        let id = id.unwrap_or_else(|| RecordId::generate(kind));

        let stored = Record {
            id: id.clone(),
            kind,
            tenant_id: scope.tenant().cloned(),
            fields,
            version: 1,
        };

        let mut records = self.records.write();
        let table = records.entry(kind).or_default();
        if table.contains_key(&id) {
            return Err(StoreError::DuplicateRecord { kind, id });
        }
        table.insert(id, stored.clone());
        drop(records);

        self.counters.write().writes += 1;
        Ok(stored)
    }

    async fn update(&self, query: &BoundQuery, changes: &FieldMap) -> StoreResult<Vec<Record>> {
        let mut records = self.records.write();
        let mut updated = Vec::new();

        if let Some(table) = records.get_mut(&query.kind()) {
            for record in table.values_mut() {
                if query.predicate().matches(record) {
                    for (name, value) in changes {
                        record.fields.insert(name.clone(), value.clone());
                    }
                    record.version += 1;
                    updated.push(record.clone());
                }
            }
        }
        drop(records);

        self.counters.write().writes += 1;
        Ok(updated)
    }

    async fn delete(&self, query: &BoundQuery) -> StoreResult<u64> {
        let mut records = self.records.write();
        let deleted = records.get_mut(&query.kind()).map_or(0, |table| {
            let before = table.len();
            table.retain(|_, r| !query.predicate().matches(r));
            (before - table.len()) as u64
        });
        drop(records);

        self.counters.write().writes += 1;
        Ok(deleted)
    }

    async fn owner_of(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Scope>> {
        let records = self.records.read();
        Ok(records
            .get(&kind)
            .and_then(|table| table.get(id))
            .map(|r| r.tenant_id.clone().map_or(Scope::Global, Scope::Tenant)))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn stats(&self) -> StoreStats {
        let counters = self.counters.read();
        let count: usize = self.records.read().values().map(BTreeMap::len).sum();

        StoreStats {
            reads: counters.reads,
            writes: counters.writes,
            record_count: Some(count as u64),
        }
    }
}
