use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use cachette::config::Config;
use cachette::fetch::HttpFetcher;
use cachette::gateway;
use cachette::manager::Manager;
use cachette::store::StoreRegistry;

/// Cachette - offline-first asset cache with a local HTTP gateway
#[derive(Parser, Debug)]
#[command(name = "cachette")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Start without precaching the manifest
    #[arg(long)]
    no_precache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cachette::logging::init_subscriber()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.validate().context("configuration is invalid")?;

    if args.test {
        println!("configuration OK: {}", args.config.display());
        return Ok(());
    }

    tracing::info!(
        config_file = %args.config.display(),
        version = %config.version,
        origin = %config.origin,
        precache_entries = config.precache.len(),
        "configuration loaded"
    );

    let registry = Arc::new(StoreRegistry::new(&config.store_prefix));
    let fetcher = Arc::new(HttpFetcher::new().context("failed to build HTTP client")?);
    let manager = Arc::new(Manager::from_config(&config, registry, fetcher.clone())?);

    if args.no_precache {
        tracing::warn!("starting without precache; the store fills on demand");
    } else {
        manager.install().await.context("install failed")?;
    }
    manager.activate().await;

    let listen_addr = config.gateway.bind_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;

    tracing::info!(
        address = %listen_addr,
        version = %manager.version(),
        store = %manager.store_name(),
        "gateway listening"
    );

    gateway::serve(listener, manager, fetcher)
        .await
        .context("gateway exited")?;

    Ok(())
}
