//! Entity kinds and their tenancy classification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every kind of record the platform stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "tasks")]
    Task,
    #[serde(rename = "expenses")]
    Expense,
    #[serde(rename = "chat-messages")]
    ChatMessage,
    #[serde(rename = "credit-cards")]
    CreditCard,
    #[serde(rename = "crew-members")]
    CrewMember,
    #[serde(rename = "plans")]
    Plan,
}

/// Who owns records of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    TenantOwned,
    /// Shared by every tenant, e.g. the subscription plan catalog
    TenantIndependent,
}

/// How quickly data of a kind goes stale; drives cache TTLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Volatile,
    Standard,
    Slow,
    Catalog,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Task,
        Self::Expense,
        Self::ChatMessage,
        Self::CreditCard,
        Self::CrewMember,
        Self::Plan,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "tasks",
            Self::Expense => "expenses",
            Self::ChatMessage => "chat-messages",
            Self::CreditCard => "credit-cards",
            Self::CrewMember => "crew-members",
            Self::Plan => "plans",
        }
    }

    #[must_use]
    pub const fn ownership(self) -> Ownership {
        match self {
            Self::Plan => Ownership::TenantIndependent,
            Self::Task
            | Self::Expense
            | Self::ChatMessage
            | Self::CreditCard
            | Self::CrewMember => Ownership::TenantOwned,
        }
    }

    #[must_use]
    pub const fn is_tenant_independent(self) -> bool {
        matches!(self.ownership(), Ownership::TenantIndependent)
    }

    #[must_use]
    pub const fn volatility(self) -> Volatility {
        match self {
            Self::ChatMessage => Volatility::Volatile,
            Self::Task | Self::Expense => Volatility::Standard,
            Self::CreditCard | Self::CrewMember => Volatility::Slow,
            Self::Plan => Volatility::Catalog,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(Error::ResourceNotFound)
    }
}

/// Compile-time marker for an entity type
pub trait Entity: Send + Sync + 'static {
    const KIND: EntityKind;
}

/// Entities whose every record belongs to exactly one tenant
pub trait TenantOwned: Entity {}

/// Entities on the tenant-independent allow-list
pub trait TenantIndependent: Entity {}

macro_rules! entity_markers {
    ($($(#[$meta:meta])* $name:ident => $kind:ident : $ownership:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl Entity for $name {
                const KIND: EntityKind = EntityKind::$kind;
            }

            impl $ownership for $name {}
        )*
    };
}

/// Marker types used to parameterise queries
pub mod entities {
    use super::{Entity, EntityKind, TenantIndependent, TenantOwned};

    entity_markers! {
        /// Crew task
        Task => Task: TenantOwned;
        /// Expense entry
        Expense => Expense: TenantOwned;
        /// Chat message
        ChatMessage => ChatMessage: TenantOwned;
        /// Credit card metadata
        CreditCard => CreditCard: TenantOwned;
        /// Crew roster entry
        CrewMember => CrewMember: TenantOwned;
        /// Global subscription plan catalog
        Plan => Plan: TenantIndependent;
    }
}
