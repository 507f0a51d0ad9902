mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mediasync::{LockError, RunError};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOCK_FILE: &str = "/tmp/mediasync.lock";

const EXIT_FATAL: u8 = 1;
const EXIT_LOCKED: u8 = 2;
const EXIT_REPORT_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "mediasync", version)]
#[command(about = "Mirror files from a remote media store into local directories")]
struct Cli {
    /// Configuration file (defaults to the first clientconfig.toml found)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Lock file guarding against concurrent runs
    #[arg(long, default_value = DEFAULT_LOCK_FILE)]
    lock_file: PathBuf,
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Download every remote file and report the result (the default)
    Sync,
    /// Validate the configuration and print the resolved mappings
    CheckConfig,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Map a failed command to the process exit status.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(LockError::AlreadyHeld { .. } | LockError::Contended { .. }) =
        err.downcast_ref::<LockError>()
    {
        return EXIT_LOCKED;
    }
    if let Some(RunError::Report(_)) = err.downcast_ref::<RunError>() {
        return EXIT_REPORT_FAILED;
    }
    EXIT_FATAL
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => commands::sync::run(cli.config.as_deref(), &cli.lock_file).await,
        Command::CheckConfig => commands::check_config::run(cli.config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
