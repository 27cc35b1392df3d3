//! Cache configuration types

use std::str::FromStr;
use std::time::Duration;

use crate::query::{EntityKind, Volatility};

/// Default maximum value size: 1MB
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1_048_576;

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    Noop,
    #[default]
    Memory,
}

impl CacheBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for CacheBackend {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "memory" | "mem" => Self::Memory,
            _ => Self::Noop,
        })
    }
}

/// Lifetimes per volatility class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtlConfig {
    /// Chat messages
    pub volatile: Duration,
    /// Tasks and expenses
    pub standard: Duration,
    /// Payment cards and crew
    pub slow: Duration,
    /// Tenant-independent reference data
    pub catalog: Duration,
}

impl CacheTtlConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            volatile: Duration::from_secs(10),
            standard: Duration::from_secs(30),
            slow: Duration::from_secs(60),
            catalog: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub const fn for_volatility(&self, volatility: Volatility) -> Duration {
        match volatility {
            Volatility::Volatile => self.volatile,
            Volatility::Standard => self.standard,
            Volatility::Slow => self.slow,
            Volatility::Catalog => self.catalog,
        }
    }

    #[must_use]
    pub const fn for_kind(&self, kind: EntityKind) -> Duration {
        self.for_volatility(kind.volatility())
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Cache backend type
    pub backend: CacheBackend,
    /// TTL configuration
    pub ttl: CacheTtlConfig,
    /// Maximum entries for in-memory cache
    pub max_entries: Option<usize>,
    /// Maximum size of a single cached value in bytes (default: 1MB)
    pub max_value_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            ttl: CacheTtlConfig::new(),
            max_entries: Some(10000),
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        let mut config = Self::new();
        config.enabled = false;
        config.backend = CacheBackend::Noop;
        config
    }
}
