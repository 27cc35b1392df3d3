//! Predicates over records

use serde::Serialize;
use serde_json::Value;

use crate::store::{Record, RecordId};
use crate::tenant::TenantId;

/// One condition of a conjunctive predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    IdEq { id: RecordId },
    TenantEq { tenant: TenantId },
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::IdEq { id } => &record.id == id,
            Self::TenantEq { tenant } => record.tenant_id.as_ref() == Some(tenant),
            Self::Eq { field, value } => record.field(field) == Some(value),
            Self::Ne { field, value } => record.field(field) != Some(value),
            Self::In { field, values } => record.field(field).is_some_and(|v| values.contains(v)),
        }
    }
}

/// Conjunction of conditions; the empty predicate matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Tenant constraints present in the predicate
    pub fn tenant_constraints(&self) -> impl Iterator<Item = &TenantId> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::TenantEq { tenant } => Some(tenant),
            _ => None,
        })
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::EntityKind;

    fn task(tenant: &str, status: &str) -> Record {
        Record {
            id: RecordId::new("task-1"),
            kind: EntityKind::Task,
            tenant_id: Some(TenantId::new(tenant).unwrap()),
            fields: json!({"status": status}).as_object().cloned().unwrap(),
            version: 1,
        }
    }

    #[test]
    fn test_empty_predicate_matches_all() {
        assert!(Predicate::new().matches(&task("yacht-1", "open")));
    }

    #[test]
    fn test_conjunction() {
        let predicate = Predicate::new()
            .and(Condition::TenantEq {
                tenant: TenantId::new("yacht-1").unwrap(),
            })
            .and(Condition::eq("status", "open"));

        assert!(predicate.matches(&task("yacht-1", "open")));
        assert!(!predicate.matches(&task("yacht-1", "done")));
        assert!(!predicate.matches(&task("yacht-2", "open")));
    }

    #[test]
    fn test_tenant_eq_never_matches_global_records() {
        let mut plan = task("yacht-1", "open");
        plan.tenant_id = None;
        let predicate = Predicate::new().and(Condition::TenantEq {
            tenant: TenantId::new("yacht-1").unwrap(),
        });
        assert!(!predicate.matches(&plan));
    }

    #[test]
    fn test_in_and_ne() {
        let record = task("yacht-1", "blocked");
        assert!(Condition::one_of("status", ["open", "blocked"]).matches(&record));
        assert!(!Condition::one_of("status", ["open"]).matches(&record));
        assert!(Condition::ne("status", "open").matches(&record));
        assert!(!Condition::ne("status", "blocked").matches(&record));
    }

    #[test]
    fn test_tenant_constraints() {
        let predicate = Predicate::new()
            .and(Condition::eq("status", "open"))
            .and(Condition::TenantEq {
                tenant: TenantId::new("yacht-5").unwrap(),
            });
        let tenants: Vec<_> = predicate.tenant_constraints().collect();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].as_str(), "yacht-5");
    }
}
