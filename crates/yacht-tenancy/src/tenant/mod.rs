//! Tenant identity and resolution
//!
//! A request enters as a [`Principal`] plus optional [`TenantHints`] and leaves
//! the resolver as a [`ResolvedContext`] bound to exactly one tenant, or to the
//! admin-wide marker for cross-tenant admin roles. Nothing in the crate looks up
//! the "current tenant" ambiently; the context is passed explicitly.

mod context;
mod id;
mod principal;
mod resolver;

pub use context::{ContextSnapshot, ExecutionMode, ResolvedContext};
pub use id::{TenantId, TenantSelector};
pub use principal::{Principal, Role};
pub use resolver::{TenancyConfig, TenantHints, TenantOverride, TenantResolver, resolve_tenant};
