//! Backing store primitives
//!
//! Every primitive takes an already-bound query or record, so a store
//! implementation never sees an operation without its tenant scope.

mod error;
mod memory;
mod record;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use record::{FieldMap, Record, RecordId};

use crate::query::{BoundQuery, EntityKind, NewRecord, Scope};

/// Store statistics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
    pub record_count: Option<u64>,
}

/// Async backing store
#[async_trait]
pub trait Store: Send + Sync {
    /// Records matching the query
    async fn select(&self, query: &BoundQuery) -> StoreResult<Vec<Record>>;

    /// Insert a new record
    async fn insert(&self, record: NewRecord) -> StoreResult<Record>;

    /// Merge `changes` into every matching record
    async fn update(&self, query: &BoundQuery, changes: &FieldMap) -> StoreResult<Vec<Record>>;

    /// Delete every matching record
    async fn delete(&self, query: &BoundQuery) -> StoreResult<u64>;

    /// Owning scope of a record, for read-before-write checks
    async fn owner_of(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Scope>>;

    async fn health_check(&self) -> StoreResult<()>;

    async fn stats(&self) -> StoreStats;
}
