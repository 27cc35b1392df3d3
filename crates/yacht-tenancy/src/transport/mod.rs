//! HTTP surface over the tenancy layer
//!
//! A thin axum router: identity comes from request headers, reads of task
//! lists and the plan catalog go through [`TenantCache`](crate::cache::TenantCache),
//! everything else goes straight to the scoped accessor. Errors render through
//! the [`ErrorTranslator`](crate::translate::ErrorTranslator).

mod http;
mod identity;

pub use http::{AppState, router, run_http};
pub use identity::{RequestContext, identity_from_headers};
