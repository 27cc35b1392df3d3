//! Cache key construction
//!
//! Keys start with the tenant segment. Tenant ids cannot contain `|` or `=`, and
//! every free-form component after it is length-prefixed, so two different tenant
//! selectors can never produce the same key whatever the remaining parameters.

use std::fmt::{self, Write};

use crate::tenant::{ResolvedContext, Role, TenantSelector};

/// Encoded cache key together with the tenant it was built for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    selector: TenantSelector,
    encoded: String,
}

impl CacheKey {
    #[must_use]
    pub const fn selector(&self) -> &TenantSelector {
        &self.selector
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    #[must_use]
    pub fn to_key_string(&self) -> String {
        self.encoded.clone()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Components of a cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    selector: TenantSelector,
    role: Role,
    principal_id: String,
    operation: String,
    params: Vec<String>,
}

impl KeyParts {
    pub fn new(
        selector: TenantSelector,
        role: Role,
        principal_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            selector,
            role,
            principal_id: principal_id.into(),
            operation: operation.into(),
            params: Vec::new(),
        }
    }

    /// Parts for the request's principal and effective tenant
    pub fn for_context(ctx: &ResolvedContext, operation: impl Into<String>) -> Self {
        Self::new(
            ctx.effective_tenant().clone(),
            ctx.principal().role(),
            ctx.principal().id(),
            operation,
        )
    }

    /// Append one positional parameter
    #[must_use]
    pub fn param(mut self, value: impl fmt::Display) -> Self {
        self.params.push(value.to_string());
        self
    }

    #[must_use]
    pub fn params<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.params
            .extend(values.iter().map(|v| v.as_ref().to_string()));
        self
    }

    #[must_use]
    pub const fn selector(&self) -> &TenantSelector {
        &self.selector
    }

    #[must_use]
    pub fn build(&self) -> CacheKey {
        CacheKey {
            selector: self.selector.clone(),
            encoded: build_key(
                &self.selector,
                self.role,
                &self.principal_id,
                &self.operation,
                &self.params,
            ),
        }
    }
}

fn push_segment(out: &mut String, value: &str) {
    let _ = write!(out, "{}:{value}|", value.len());
}

/// Deterministic key for a cached operation
pub fn build_key<S: AsRef<str>>(
    selector: &TenantSelector,
    role: Role,
    principal_id: &str,
    operation: &str,
    ordered_params: &[S],
) -> String {
    let mut key = match selector {
        TenantSelector::Tenant(id) => format!("t={id}|"),
        TenantSelector::AdminWide => String::from("aw|"),
    };

    key.push_str(role.as_str());
    key.push('|');
    push_segment(&mut key, principal_id);
    push_segment(&mut key, operation);
    let _ = write!(key, "{}#", ordered_params.len());
    for param in ordered_params {
        push_segment(&mut key, param.as_ref());
    }

    key
}
