//! Configuration builder

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::Error;
use crate::cache::{CacheBackend, CacheConfig, CacheTtlConfig};
use crate::tenant::{Role, TenancyConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub tenancy: TenancyConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.server.environment
    }

    #[must_use]
    pub const fn tenancy(&self) -> &TenancyConfig {
        &self.tenancy
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}

/// Deployment environment. Controls how much error detail reaches clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "dev" | "development" | "local" => Self::Development,
            _ => Self::Production,
        })
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_host: IpAddr,
    pub http_port: u16,
    pub environment: Environment,
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: 8080,
            environment: Environment::Production,
            request_timeout: Duration::from_secs(60),
            cors_origins: Vec::new(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    server: ServerConfig,
    admin_roles: Option<BTreeSet<Role>>,
    cache: CacheConfig,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            server: ServerConfig {
                http_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                http_port: 8080,
                environment: Environment::Production,
                request_timeout: Duration::from_secs(60),
                cors_origins: Vec::new(),
            },
            admin_roles: None,
            cache: CacheConfig::new(),
            telemetry: TelemetryConfig {
                otlp_endpoint: None,
                service_name: String::new(),
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.server.http_host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.server.http_port = port;
        self
    }

    #[must_use]
    pub const fn environment(mut self, environment: Environment) -> Self {
        self.server.environment = environment;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.server.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.server.cors_origins = origins;
        self
    }

    /// Roles allowed to act across tenants
    #[must_use]
    pub fn admin_roles(mut self, roles: BTreeSet<Role>) -> Self {
        self.admin_roles = Some(roles);
        self
    }

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    // Cache configuration methods

    /// Enable or disable caching (enabled by default)
    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// Set cache backend type
    #[must_use]
    pub const fn cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache.backend = backend;
        self
    }

    /// Set cache TTL configuration
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: CacheTtlConfig) -> Self {
        self.cache.ttl = ttl;
        self
    }

    /// TTL for volatile resources such as chat messages
    #[must_use]
    pub const fn cache_volatile_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.volatile = ttl;
        self
    }

    /// TTL for tasks and expenses
    #[must_use]
    pub const fn cache_standard_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.standard = ttl;
        self
    }

    /// TTL for slowly changing resources such as card metadata
    #[must_use]
    pub const fn cache_slow_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.slow = ttl;
        self
    }

    /// TTL for tenant-independent reference data
    #[must_use]
    pub const fn cache_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.catalog = ttl;
        self
    }

    /// Set maximum cache entries
    #[must_use]
    pub const fn cache_max_entries(mut self, max: Option<usize>) -> Self {
        self.cache.max_entries = max;
        self
    }

    /// Set maximum value size for cache entries (default: 1MB)
    #[must_use]
    pub const fn cache_max_value_size(mut self, max: usize) -> Self {
        self.cache.max_value_size = max;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        if self.cache.enabled && self.cache.max_value_size == 0 {
            return Err(Error::Config("cache max_value_size must be positive".into()));
        }

        let tenancy = match self.admin_roles {
            Some(roles) => TenancyConfig { admin_roles: roles },
            None => TenancyConfig::default(),
        };

        let service_name = if self.telemetry.service_name.is_empty() {
            "yacht-tenancy".to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            server: self.server,
            tenancy,
            cache: self.cache,
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
