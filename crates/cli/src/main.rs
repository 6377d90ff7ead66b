//! Bumblebot CLI — the main entry point.
//!
//! Commands:
//! - `run`    — Connect to Telegram and serve chats
//! - `check`  — Validate configuration and report what is enabled

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "bumblebot",
    about = "Bumblebot — a Telegram chat assistant with layered memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file (defaults to env + built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Telegram and serve chats
    Run,

    /// Validate configuration and report what is enabled
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => bumblebot_config::AppConfig::load(path)?,
        None => bumblebot_config::AppConfig::from_env(),
    };

    match cli.command {
        Commands::Run => commands::run::run(config).await?,
        Commands::Check => commands::check::run(config).await?,
    }

    Ok(())
}
