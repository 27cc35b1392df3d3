//! Query model: entity kinds, predicates and tenant-bound specifications

mod entity;
mod predicate;
mod spec;

pub use entity::{
    Entity, EntityKind, Ownership, TenantIndependent, TenantOwned, Volatility, entities,
};
pub use predicate::{Condition, Predicate};
pub use spec::{BoundQuery, CreateSpec, DeleteSpec, NewRecord, QuerySpec, Scope, UpdateSpec};
