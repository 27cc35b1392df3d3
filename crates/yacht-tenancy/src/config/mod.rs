//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, Environment, ServerConfig, TelemetryConfig};

use std::path::Path;

use crate::Result;

/// Load configuration with precedence: env > file > defaults
pub fn load_config() -> Result<ConfigBuilder> {
    load_config_over(ConfigBuilder::new(), None)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<ConfigBuilder> {
    load_config_over(ConfigBuilder::new(), Some(path))
}

/// Layer file and environment settings over an existing builder.
///
/// When `path` is `None` the standard locations are searched and a missing
/// file is not an error.
pub fn load_config_over(mut builder: ConfigBuilder, path: Option<&Path>) -> Result<ConfigBuilder> {
    match path {
        Some(path) => {
            builder = file::load_from_file(path, builder)?;
        }
        None => {
            if let Some(path) = file::find_config_file() {
                tracing::info!("Loading configuration from {}", path.display());
                builder = file::load_from_file(&path, builder)?;
            }
        }
    }

    // Override with environment variables
    builder = env::load_from_env(builder)?;

    Ok(builder)
}
