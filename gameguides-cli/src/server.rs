use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use gameguides_server::config::{DEFAULT_DATABASE, DEFAULT_MAX_POOL_SIZE};
use gameguides_server::{GuideStore, MongoGuideStore, ServerConfig, StoreConfig};
use tracing::{info, warn};

/// Document store connection flags
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    /// Database holding the guides collection
    #[arg(long, env = "MONGODB_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Maximum connections in the driver pool
    #[arg(long, env = "MONGODB_MAX_POOL_SIZE", default_value_t = DEFAULT_MAX_POOL_SIZE)]
    pub max_pool_size: u32,
}

impl StoreArgs {
    /// Build and validate the store config; a missing URI fails here, before
    /// anything is bound or connected.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig::new(
            self.mongodb_uri.clone().unwrap_or_default(),
            self.database.clone(),
        );
        config.max_pool_size = self.max_pool_size;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Address to bind the HTTP server to
    #[arg(long, env = "GAMEGUIDES_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Allow requests from any origin (default: localhost only)
    #[arg(long, env = "GAMEGUIDES_CORS_PERMISSIVE")]
    pub cors_permissive: bool,

    /// Request timeout in seconds
    #[arg(long, env = "GAMEGUIDES_REQUEST_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let store_config = args.store.store_config()?;
    info!(uri = %store_config.redacted_uri(), database = %store_config.database, "Using MongoDB");

    let store = Arc::new(MongoGuideStore::new(store_config));

    // Warm the connection; a failure here is retried by the first request
    if let Err(e) = store.ping().await {
        warn!("MongoDB not reachable yet: {}", e);
    }

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
        request_timeout: Duration::from_secs(args.timeout),
    };

    gameguides_server::run_server(store, config)
        .await
        .context("server failed")?;
    Ok(())
}

pub async fn run_ping(args: StoreArgs) -> Result<()> {
    let store_config = args.store_config()?;
    let database = store_config.database.clone();
    let store = MongoGuideStore::new(store_config);

    store
        .ping()
        .await
        .with_context(|| format!("could not reach MongoDB database '{}'", database))?;
    println!("MongoDB reachable (database '{}')", database);

    store.close().await;
    Ok(())
}
