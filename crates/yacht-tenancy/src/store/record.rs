//! Stored records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::EntityKind;
use crate::tenant::TenantId;

/// Record payload: a JSON object of field values
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random identifier for a newly created record
    #[must_use]
    pub fn generate(kind: EntityKind) -> Self {
        let prefix = kind.as_str().trim_end_matches('s');
        Self(format!("{prefix}-{}", uuid::Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single stored record.
///
/// `tenant_id` is `None` only for tenant-independent kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: EntityKind,
    pub tenant_id: Option<TenantId>,
    pub fields: FieldMap,
    pub version: u64,
}

impl Record {
    /// Copy restricted to the requested fields; an empty list keeps all fields
    #[must_use]
    pub fn project(&self, fields: &[String]) -> Self {
        if fields.is_empty() {
            return self.clone();
        }

        let projected = self
            .fields
            .iter()
            .filter(|(name, _)| fields.iter().any(|f| f == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            id: self.id.clone(),
            kind: self.kind,
            tenant_id: self.tenant_id.clone(),
            fields: projected,
            version: self.version,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}
