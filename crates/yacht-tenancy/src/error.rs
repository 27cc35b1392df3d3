use thiserror::Error;

use crate::audit::Violation;
use crate::cache::CacheError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No tenant assigned")]
    NoTenantAssigned,

    #[error("Invalid tenant identifier: {0}")]
    InvalidTenantId(String),

    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("Tenant isolation violation: {0}")]
    TenantIsolationViolation(Box<Violation>),

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Cache compute failed: {0}")]
    CacheComputeFailure(#[source] Box<Error>),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    #[must_use]
    pub fn violation(violation: Violation) -> Self {
        Self::TenantIsolationViolation(Box::new(violation))
    }

    #[must_use]
    pub const fn is_no_tenant(&self) -> bool {
        matches!(self, Self::NoTenantAssigned)
    }

    #[must_use]
    pub const fn is_isolation_violation(&self) -> bool {
        matches!(self, Self::TenantIsolationViolation(_))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound)
    }

    #[must_use]
    pub const fn is_compute_failure(&self) -> bool {
        matches!(self, Self::CacheComputeFailure(_))
    }

    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Violation details, looking through compute failures
    #[must_use]
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            Self::TenantIsolationViolation(v) => Some(&**v),
            Self::CacheComputeFailure(inner) => inner.as_violation(),
            _ => None,
        }
    }

    /// Innermost error, looking through compute failures
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::CacheComputeFailure(inner) => inner.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
