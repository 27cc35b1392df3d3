//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::builder::{ConfigBuilder, Environment};
use crate::Result;
use crate::cache::CacheBackend;
use crate::tenant::Role;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./yacht-tenancy.toml",
    "~/.config/yacht-tenancy/config.toml",
    "/etc/yacht-tenancy/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    // Tenancy settings
    if let Some(tenancy) = config.tenancy
        && let Some(roles) = tenancy.admin_roles
    {
        let roles = roles
            .iter()
            .map(|r| {
                r.parse::<Role>()
                    .map_err(|_| crate::Error::Config(format!("Unknown admin role: {r}")))
            })
            .collect::<Result<_>>()?;
        builder = builder.admin_roles(roles);
    }

    // Cache settings
    if let Some(cache) = config.cache {
        if let Some(enabled) = cache.enabled {
            builder = builder.cache_enabled(enabled);
        }

        if let Some(backend) = cache.backend {
            let backend: CacheBackend = backend.parse().unwrap_or_default();
            builder = builder.cache_backend(backend);
        }

        if let Some(max) = cache.max_entries {
            builder = builder.cache_max_entries((max > 0).then_some(max));
        }

        if let Some(size) = cache.max_value_size {
            builder = builder.cache_max_value_size(size);
        }

        if let Some(ttl) = cache.ttl {
            if let Some(secs) = ttl.volatile_secs {
                builder = builder.cache_volatile_ttl(Duration::from_secs(secs));
            }
            if let Some(secs) = ttl.standard_secs {
                builder = builder.cache_standard_ttl(Duration::from_secs(secs));
            }
            if let Some(secs) = ttl.slow_secs {
                builder = builder.cache_slow_ttl(Duration::from_secs(secs));
            }
            if let Some(secs) = ttl.catalog_secs {
                builder = builder.cache_catalog_ttl(Duration::from_secs(secs));
            }
        }
    }

    // Server settings
    if let Some(server) = config.server {
        if let Some(host_str) = server.host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = server.port {
            builder = builder.http_port(port);
        }

        if let Some(environment) = server.environment {
            let environment: Environment = environment.parse().unwrap_or_default();
            builder = builder.environment(environment);
        }

        if let Some(timeout) = server.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        if let Some(origins) = server.cors_origins {
            builder = builder.cors_origins(origins);
        }
    }

    // Observability settings
    if let Some(obs) = config.observability {
        if let Some(endpoint) = obs.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    tenancy: Option<TenancyFileConfig>,
    cache: Option<CacheFileConfig>,
    server: Option<ServerFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct TenancyFileConfig {
    admin_roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    enabled: Option<bool>,
    backend: Option<String>,
    max_entries: Option<usize>,
    max_value_size: Option<usize>,
    ttl: Option<CacheTtlFileConfig>,
}

#[derive(Debug, Deserialize)]
struct CacheTtlFileConfig {
    volatile_secs: Option<u64>,
    standard_secs: Option<u64>,
    slow_secs: Option<u64>,
    catalog_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ServerFileConfig {
    host: Option<String>,
    port: Option<u16>,
    environment: Option<String>,
    request_timeout_secs: Option<u64>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}
