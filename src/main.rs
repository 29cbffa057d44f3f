//! CLI entry point for joblo.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod cli;
mod commands;

use cli::{Cli, Command, SessionCommand};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(dotenvy::Error::Io(_)) => debug!("no .env file"),
        Err(e) => return Err(e.into()),
    }

    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Command::Profiles(args) => commands::run_profiles_command(&args, cli.quiet).await,
        Command::Jobs(args) => commands::run_jobs_command(&args).await,
        Command::Company(args) => commands::run_company_command(&args).await,
        Command::Serve(args) => commands::run_serve_command(&args).await,
        Command::Session { command } => match command {
            SessionCommand::Import { source } => {
                commands::run_session_import_command(source.as_deref())
            }
            SessionCommand::Status => commands::run_session_status_command(),
            SessionCommand::Clear => commands::run_session_clear_command(),
        },
        Command::Prune(args) => commands::run_prune_command(&args).await,
    }
}
