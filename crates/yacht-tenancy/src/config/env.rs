//! Environment variable loading for configuration

use std::collections::BTreeSet;
use std::env;
use std::net::IpAddr;

use super::builder::{ConfigBuilder, Environment};
use crate::Result;
use crate::cache::CacheBackend;
use crate::tenant::Role;

/// Environment variable names
mod vars {
    pub const YACHT_ADMIN_ROLES: &str = "YACHT_ADMIN_ROLES";
    pub const YACHT_CACHE_ENABLED: &str = "YACHT_CACHE_ENABLED";
    pub const YACHT_CACHE_BACKEND: &str = "YACHT_CACHE_BACKEND";
    pub const YACHT_CACHE_MAX_ENTRIES: &str = "YACHT_CACHE_MAX_ENTRIES";
    pub const YACHT_HTTP_HOST: &str = "YACHT_HTTP_HOST";
    pub const YACHT_HTTP_PORT: &str = "YACHT_HTTP_PORT";
    pub const YACHT_ENVIRONMENT: &str = "YACHT_ENVIRONMENT";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const YACHT_JSON_LOGS: &str = "YACHT_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Tenancy
    if let Ok(roles) = env::var(vars::YACHT_ADMIN_ROLES) {
        builder = builder.admin_roles(parse_roles(&roles)?);
    }

    // Cache
    if let Ok(val) = env::var(vars::YACHT_CACHE_ENABLED) {
        builder = builder.cache_enabled(parse_bool(&val));
    }

    if let Ok(backend) = env::var(vars::YACHT_CACHE_BACKEND) {
        let backend: CacheBackend = backend.parse().unwrap_or_default();
        builder = builder.cache_backend(backend);
    }

    if let Ok(max_str) = env::var(vars::YACHT_CACHE_MAX_ENTRIES)
        && let Ok(max) = max_str.parse::<usize>()
    {
        builder = builder.cache_max_entries((max > 0).then_some(max));
    }

    // Server
    if let Ok(host_str) = env::var(vars::YACHT_HTTP_HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.http_host(host);
    }

    if let Ok(port_str) = env::var(vars::YACHT_HTTP_PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.http_port(port);
    }

    if let Ok(environment) = env::var(vars::YACHT_ENVIRONMENT) {
        let environment: Environment = environment.parse().unwrap_or_default();
        builder = builder.environment(environment);
    }

    // Telemetry
    if let Ok(endpoint) = env::var(vars::OTEL_EXPORTER_OTLP_ENDPOINT) {
        builder = builder.otlp_endpoint(Some(endpoint));
    }

    if let Ok(name) = env::var(vars::OTEL_SERVICE_NAME) {
        builder = builder.service_name(name);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::YACHT_JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Comma-separated role list. Unknown roles are a configuration error.
pub(super) fn parse_roles(s: &str) -> Result<BTreeSet<Role>> {
    s.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.parse::<Role>()
                .map_err(|_| crate::Error::Config(format!("Unknown admin role: {r}")))
        })
        .collect()
}
