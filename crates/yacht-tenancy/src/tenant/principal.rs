//! Authenticated principal as handed over by the identity layer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::TenantId;
use crate::error::Error;

/// Platform roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Crew,
    Captain,
    Manager,
    Owner,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crew => "CREW",
            Self::Captain => "CAPTAIN",
            Self::Manager => "MANAGER",
            Self::Owner => "OWNER",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "CREW" => Ok(Self::Crew),
            "CAPTAIN" => Ok(Self::Captain),
            "MANAGER" => Ok(Self::Manager),
            "OWNER" => Ok(Self::Owner),
            "SUPER_ADMIN" | "SUPERADMIN" => Ok(Self::SuperAdmin),
            other => Err(Error::InvalidPrincipal(format!("unknown role {other}"))),
        }
    }
}

/// Authenticated actor. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    role: Role,
    home_tenant_id: Option<TenantId>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            home_tenant_id: None,
        }
    }

    #[must_use]
    pub fn with_home_tenant(mut self, tenant: TenantId) -> Self {
        self.home_tenant_id = Some(tenant);
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn home_tenant_id(&self) -> Option<&TenantId> {
        self.home_tenant_id.as_ref()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
