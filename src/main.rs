//! CLI entry point for the Prodigy Remote In simulator.
//!
//! Serves the line-oriented analyzer protocol on TCP, one independent
//! session per connection. Settings come from an optional TOML file;
//! `--host` and `--port` override the file.
//!
//! # Usage
//!
//! ```bash
//! prodigy_sim --port 7010
//! prodigy_sim --config config/default.toml
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use prodigy_sim::clock::SystemClock;
use prodigy_sim::config::Settings;
use prodigy_sim::network::server::RemoteInServer;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "prodigy-sim")]
#[command(about = "SpecsLab Prodigy Remote In analyzer simulator", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override
    #[arg(long)]
    host: Option<String>,

    /// Listen port override
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.clone()),
    )
    .init();

    info!("Simulated analyzer: {}", settings.analyzer.visible_name);
    let server = RemoteInServer::bind(Arc::new(settings), Arc::new(SystemClock)).await?;
    server.run().await?;
    Ok(())
}
