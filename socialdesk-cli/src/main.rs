//! socialdesk CLI - operator tooling for the socialdesk database engine
//!
//! - `ping`: open the pool, run the liveness probe, report pool stats
//! - `config`: show the resolved configuration with secrets masked

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use socialdesk_db::Db;
use tracing::info;

mod config;
mod tracing_setup;

use config::CliConfig;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "socialdesk",
    author,
    version,
    about = "Operator tooling for the socialdesk database engine"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to config file (default: ~/.socialdesk/config.toml)
    #[arg(long, global = true, env = "SOCIALDESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the connection pool, probe the database, and print pool stats
    Ping,
    /// Print the resolved configuration (password masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ping => run_ping(&config).await?,
        Commands::Config => print!("{}", config.to_redacted_toml()?),
    }

    Ok(())
}

async fn run_ping(config: &CliConfig) -> Result<()> {
    let db_config = &config.database;
    let db = Db::init(db_config)
        .await
        .with_context(|| format!("Failed to connect to {}", db_config.redacted_url()))?;

    let started = std::time::Instant::now();
    let probe = db.ping().await;
    let stats = db.stats();
    db.close().await;
    probe.context("Liveness probe failed")?;

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "ping ok");
    println!(
        "ok  {}  {}  (pool: {} open, {} idle, max {})",
        db_config.driver,
        db_config.redacted_url(),
        stats.size,
        stats.idle,
        stats.max_open
    );
    Ok(())
}
