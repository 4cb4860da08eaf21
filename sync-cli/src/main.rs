//! # tandem
//!
//! CLI for tandem-sync endpoints.
//!
//! ## Commands
//!
//! - `status`: Show the persisted interval and configuration
//! - `set`: Change the interval on this endpoint
//! - `run`: Run the interval timer and play crossings
//! - `simulate`: Watch a primary and a companion converge over a loopback link
//!
//! ## Example
//!
//! ```bash
//! # Change the interval to 12 minutes
//! tandem set 12
//!
//! # Run the timer for two minutes
//! tandem run --seconds 120
//!
//! # Set 20 on the companion while disconnected, then reconnect
//! tandem simulate --minutes 20 --from companion
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tandem_sync_types::Role;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

use commands::{run, set, simulate, status};
use config::Config;

/// CLI for tandem-sync endpoints.
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding settings.json and tandem.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: tandem.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the persisted interval and configuration
    Status,

    /// Set the interval in minutes (1-60)
    Set {
        /// Minutes between pulses
        minutes: i64,
    },

    /// Run the interval timer
    Run {
        /// How long to run, in seconds
        #[arg(long, default_value = "60")]
        seconds: u64,
    },

    /// Simulate two endpoints converging over a loopback link
    Simulate {
        /// Interval to set while the link is down
        #[arg(long, default_value = "12")]
        minutes: i64,

        /// Endpoint that makes the change
        #[arg(long, value_enum, default_value = "primary")]
        from: Side,
    },
}

/// Endpoint side, as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Primary,
    Companion,
}

impl From<Side> for Role {
    fn from(side: Side) -> Self {
        match side {
            Side::Primary => Role::Primary,
            Side::Companion => Role::Companion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let config = Config::load(cli.config.as_deref(), &data_dir)?;
    tracing::debug!("Using data directory {}", data_dir.display());

    match cli.command {
        Commands::Status => {
            status::run(&data_dir, &config).await?;
        }
        Commands::Set { minutes } => {
            set::run(&data_dir, &config, minutes).await?;
        }
        Commands::Run { seconds } => {
            run::run(&data_dir, &config, seconds).await?;
        }
        Commands::Simulate { minutes, from } => {
            simulate::run(from.into(), minutes).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for tandem.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "tandem")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
