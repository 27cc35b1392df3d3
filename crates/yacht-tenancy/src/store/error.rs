//! Backing store error types

use thiserror::Error;

use super::record::RecordId;
use crate::query::EntityKind;

/// Backing store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Duplicate {kind} record: {id}")]
    DuplicateRecord { kind: EntityKind, id: RecordId },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
