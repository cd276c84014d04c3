//! Forge - command-line access to the Forge backend API
//!
//! Main entry point for the Forge CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, call, health, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Forge - command-line access to the Forge backend API
#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// API base URL (default: from config, then http://localhost:8000/api/v1/)
    #[arg(long, global = true, env = "FORGE_API_URL")]
    pub server: Option<String>,

    /// Session file holding credentials between invocations
    #[arg(long, global = true, env = "FORGE_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to the backend
    Login(auth::LoginArgs),

    /// Log out and forget the stored credentials
    Logout,

    /// Show session status
    Status,

    /// Make an authenticated API call
    Call(call::CallArgs),

    /// Check whether the backend API is reachable
    Health,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "forge=debug,forge_client=debug,forge_session=debug,forge_config=debug,info"
    } else {
        "forge=info,forge_client=warn,forge_session=warn,warn"
    };

    let log_dir = forge_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "forge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "forge=trace,forge_client=trace,forge_session=trace,forge_config=trace,info",
                )),
        )
        .init();

    let loaded = forge_config::load_config(None)?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context::new(
        loaded,
        cli.server,
        cli.session_file,
        cli.json,
        cli.verbose,
    )?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Login(args) => auth::login(args, &ctx).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Status => status::run(&ctx).await,
        Commands::Call(args) => call::run(args, &ctx).await,
        Commands::Health => health::run(&ctx).await,
    }
}
