//! clubdesk - a command-line front end for club management.
//!
//! Logs in against the clubdesk backend, keeps the session in the OS
//! keychain, and lists clubs, groups, students and schedules.

mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clubdesk_core::{AuthService, Config};

use commands::{Cli, Command};

/// Directory for an optional daily log file
const LOG_DIR_ENV: &str = "CLUBDESK_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when file logging is enabled; it must live
/// until exit so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "clubdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("clubdesk starting");

    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_url = Some(url.clone());
    }

    let auth = AuthService::new(&config)?;

    let code = match cli.command {
        Command::Login { email } => commands::login(&auth, &mut config, email).await?,
        Command::Signup { email, name } => commands::signup(&auth, &mut config, email, name).await?,
        Command::Logout => commands::logout(&auth)?,
        schedule @ Command::Schedule { .. } => commands::run(&auth, schedule).await?,
        other => {
            // Everything else needs a session restored from the token store.
            match commands::restore(&auth).await? {
                Some(code) => code,
                None => commands::run(&auth, other).await?,
            }
        }
    };

    info!("clubdesk exiting");
    Ok(code)
}
