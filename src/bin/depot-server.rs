//! Depot server binary
//!
//! HTTP front-end for the model repository.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use model_depot::config::{Config, StoreConfig};
use model_depot::repository::Repository;
use model_depot::server;
use model_depot::store::{ContentStore, FileStore, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "depot-server")]
#[command(about = "Model artifact registry server", long_about = None)]
struct Args {
    /// Bind address for the HTTP server
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Blob storage directory path
    #[arg(short, long, default_value = "/var/lib/model-depot/blobs")]
    store: PathBuf,

    /// TOML configuration file (overrides the flags above)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Some(
            Config::load(path).with_context(|| format!("failed to load config from {:?}", path))?,
        ),
        None => None,
    };

    let default_level = config
        .as_ref()
        .map(|c| c.server.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let (bind, store): (String, Arc<dyn ContentStore>) = match &config {
        Some(config) => {
            let store: Arc<dyn ContentStore> = match &config.store {
                StoreConfig::File { path } => Arc::new(FileStore::new(path)?),
                StoreConfig::Memory => Arc::new(MemoryStore::new()),
            };
            (config.server.bind.clone(), store)
        }
        None => (args.bind.clone(), Arc::new(FileStore::new(&args.store)?)),
    };

    let repo = Arc::new(Repository::new(store));
    let app = server::router(repo);

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    log::info!("Starting depot server");
    log::info!("  Bind address: {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
