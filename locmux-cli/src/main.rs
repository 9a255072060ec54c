//! Locmux CLI - drive the location manager against a simulated sensor
//!
//! This binary exercises the library end to end: a simulated GPS warms up
//! over a few seconds while one-shot requests or subscriptions are served
//! through the production tokio timers and event loop.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (for example `RUST_LOG=locmux=debug`).

mod commands;
mod error;
mod simulator;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::locate::LocateArgs;
use commands::watch::WatchArgs;

#[derive(Debug, Parser)]
#[command(name = "locmux")]
#[command(version, about = "Share one location sensor among many requests", long_about = None)]
struct Cli {
    /// Print reports as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask for the current location once
    Locate(LocateArgs),
    /// Stream location updates
    Watch(WatchArgs),
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Locate(args) => commands::locate::run(args, cli.json).await,
        Commands::Watch(args) => commands::watch::run(args, cli.json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
