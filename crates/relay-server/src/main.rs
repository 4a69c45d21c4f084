//! # relay
//!
//! Entry point of the registry translation proxy. Loads configuration,
//! sets up logging and serves the proxy until interrupted.

use camino::Utf8PathBuf;
use clap::Parser;
use relay_cache::TarballCache;
use relay_config::{CliOverrides, ConfigLayering, ConfigLoader, ConfigSource};
use relay_core::error::{RelayError, RelayResult};
use relay_server::{build_router, AppState, RegistryProxy};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Interval between sweeps of expired cache entries
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Serve origin registry packages as npm-compatible shims
#[derive(Parser)]
#[command(name = "relay", version, about = "Registry translation proxy")]
pub struct Cli {
    /// Path to relay.toml (searched upwards from the working directory by default)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Address to listen on
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Origin registry URL
    #[arg(long, value_name = "URL")]
    pub origin: Option<Url>,

    /// Public URL advertised in tarball links
    #[arg(long, value_name = "URL")]
    pub public_url: Option<Url>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> RelayResult<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!("Starting relay v{}", env!("CARGO_PKG_VERSION"));

    let result = run(cli);
    if let Err(e) = &result {
        error!("{}", e);
        if let Some(suggestion) = e.suggestion() {
            error!("help: {}", suggestion);
        }
    }
    result
}

fn run(cli: Cli) -> RelayResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| RelayError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(serve(cli))
}

async fn serve(cli: Cli) -> RelayResult<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| RelayError::io("Failed to read working directory".to_string(), e))?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
        RelayError::io(
            "Working directory is not valid UTF-8".to_string(),
            e.into_io_error(),
        )
    })?;

    let (base, source) = ConfigLoader::new(cwd).load(cli.config.as_deref()).await?;
    match &source {
        ConfigSource::File(path) => info!("Using configuration from {}", path),
        ConfigSource::Defaults => debug!("No relay.toml found, using defaults"),
    }

    let overrides = CliOverrides {
        listen: cli.listen,
        origin: cli.origin,
        public_url: cli.public_url,
    };
    let config = ConfigLayering::merge(
        base,
        &ConfigLayering::collect_env_overrides(),
        &overrides,
    )?;

    let capacity = NonZeroUsize::new(config.cache.capacity).ok_or_else(|| {
        RelayError::ConfigValidation {
            field: "cache.capacity".to_string(),
            reason: "Must be greater than zero".to_string(),
        }
    })?;
    let cache = Arc::new(TarballCache::new(config.cache.ttl(), capacity));
    spawn_cache_purge(cache.clone());

    let proxy = RegistryProxy::from_config(&config, cache)?;
    let app = build_router(AppState {
        proxy: Arc::new(proxy),
        public_url: config.server.public_url.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .map_err(|e| RelayError::io(format!("Failed to bind {}", config.server.listen), e))?;

    info!(
        listen = %config.server.listen,
        origin = %config.origin.registry_url,
        "Relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::io("Server error".to_string(), e))?;

    info!("Relay stopped");
    Ok(())
}

fn spawn_cache_purge(cache: Arc<TarballCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired tarballs");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "relay={level},relay_server={level},relay_cache={level},relay_registry={level},relay_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
