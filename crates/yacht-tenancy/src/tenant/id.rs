//! Tenant identifiers and selectors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ADMIN_WIDE, MAX_TENANT_ID_LEN, TENANT_ID_PREFIX};
use crate::error::{Error, Result};

/// Opaque identifier of a tenant (a yacht).
///
/// Accepts `[A-Za-z0-9_-]` only, so the value can never contain the separators
/// used by cache keys and tags. The `admin-wide` label is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{TENANT_ID_PREFIX}-{}", uuid::Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidTenantId("empty identifier".into()));
    }

    if id.len() > MAX_TENANT_ID_LEN {
        return Err(Error::InvalidTenantId(format!(
            "identifier exceeds {MAX_TENANT_ID_LEN} characters"
        )));
    }

    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::InvalidTenantId(
            "identifier contains unsupported characters".into(),
        ));
    }

    if id.eq_ignore_ascii_case(ADMIN_WIDE) {
        return Err(Error::InvalidTenantId("reserved identifier".into()));
    }

    Ok(())
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Either one concrete tenant or the cross-tenant admin marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantSelector {
    Tenant(TenantId),
    AdminWide,
}

impl TenantSelector {
    #[must_use]
    pub const fn tenant(&self) -> Option<&TenantId> {
        match self {
            Self::Tenant(id) => Some(id),
            Self::AdminWide => None,
        }
    }

    /// Concrete tenant, or `NoTenantAssigned` for the admin-wide marker
    pub fn require_tenant(&self) -> Result<&TenantId> {
        self.tenant().ok_or(Error::NoTenantAssigned)
    }

    #[must_use]
    pub const fn is_admin_wide(&self) -> bool {
        matches!(self, Self::AdminWide)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Tenant(id) => id.as_str(),
            Self::AdminWide => ADMIN_WIDE,
        }
    }
}

impl fmt::Display for TenantSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<TenantId> for TenantSelector {
    fn from(id: TenantId) -> Self {
        Self::Tenant(id)
    }
}
