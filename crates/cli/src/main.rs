//! KonataBlog CLI - talk to a KonataBlog backend from the terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "konata")]
#[command(about = "Manage a KonataBlog from the command line")]
#[command(version)]
struct Cli {
    /// Set logging level (defaults to KONATA_LOG, then info)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Settings file (TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "KONATA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the stored token and the log file
    #[arg(short = 'd', long, global = true)]
    state_dir: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    /// Fail instead of serving demo data when the backend is unreachable
    #[arg(long, global = true)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref(), cli.state_dir, cli.no_fallback)?;
    logging::init_logging(
        cli.log_level.map(Into::into),
        &settings.state_dir,
        cli.no_file_log,
    )?;

    info!(base_url = %settings.api.base_url, "Starting KonataBlog CLI");

    // Execute command with optional timeout
    if cli.timeout == 0 {
        match cli.command.execute(&settings).await {
            Ok(()) => {
                info!("Command completed successfully");
            }
            Err(e) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(&settings)).await {
            Ok(Ok(())) => {
                info!("Command completed successfully");
            }
            Ok(Err(e)) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
