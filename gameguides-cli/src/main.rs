//! gameguides CLI - runs the GameGuides content API
//!
//! - `serve`: HTTP API over MongoDB until SIGINT/SIGTERM
//! - `ping`: check that the configured database is reachable

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

mod config;
mod server;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "gameguides",
    author,
    version,
    about = "GameGuides content API - guides stored in MongoDB, served as JSON"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(server::ServeArgs),

    /// Check the MongoDB connection and exit
    Ping(server::StoreArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so .env values feed clap's env fallbacks
    let env_sources = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init_tracing(&TracingConfig { debug: cli.debug }).ok();
    if env_sources.is_empty() {
        debug!("No .env files found (current dir or ~/.gameguides)");
    } else {
        info!("Loaded configuration from: {}", env_sources.join(", "));
    }

    match cli.command {
        Commands::Serve(args) => server::run_serve(args).await?,
        Commands::Ping(args) => server::run_ping(args).await?,
    }

    Ok(())
}
