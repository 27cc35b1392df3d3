use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use yacht_tenancy::CacheBackend;
use yacht_tenancy::config::{self, ConfigBuilder, Environment};
use yacht_tenancy::observability::{init_observability, shutdown_observability};
use yacht_tenancy::transport::{AppState, run_http};

#[derive(Parser, Debug)]
#[command(name = "yacht-tenancy")]
#[command(about = "Tenant-isolated data and cache service for yacht operations", long_about = None)]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// HTTP bind port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,

    /// Development mode: error responses include internal detail
    #[arg(long)]
    dev: bool,

    /// Cache backend (memory or noop)
    #[arg(long, default_value = "memory")]
    cache_backend: String,

    /// Disable caching entirely
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // CLI values are the base layer; file and env override them
    let mut builder = ConfigBuilder::new()
        .http_host(args.host)
        .http_port(args.port)
        .json_logs(args.json_logs)
        .cache_backend(args.cache_backend.parse().unwrap_or(CacheBackend::Memory));

    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }

    if args.dev {
        builder = builder.environment(Environment::Development);
    }

    if args.no_cache {
        builder = builder.cache_enabled(false);
    }

    let config = config::load_config_over(builder, args.config.as_deref())?.build()?;

    init_observability(&config.telemetry)?;

    tracing::info!(
        environment = config.environment().as_str(),
        cache.enabled = config.cache.enabled,
        cache.backend = config.cache.backend.as_str(),
        admin_roles = ?config.tenancy.admin_roles,
        "Starting yacht-tenancy"
    );

    let state = AppState::in_memory(&config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    let result = run_http(state, &config.server, shutdown).await;

    shutdown_observability();

    result.map_err(Into::into)
}
