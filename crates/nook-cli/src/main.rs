//! Nook CLI - notes, folders and favourites from the terminal
//!
//! Every command is one-shot: it restores the saved session, applies its
//! change and waits for the resulting sync push before exiting.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::AppContext;
use crate::commands::completions::run_completions;
use crate::commands::folders::run_folders;
use crate::commands::notes::run_notes;
use crate::commands::sync::run_sync;
use crate::commands::tags::run_tags;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
                .add_directive("nook=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let context = AppContext::load(cli.config.as_deref(), cli.data_dir)?;
    match cli.command {
        Commands::Auth { command } => run_auth(command, &context).await,
        Commands::Folders { command } => run_folders(command, &context).await,
        Commands::Notes { command } => run_notes(command, &context).await,
        Commands::Tags { command } => run_tags(command, &context),
        Commands::Sync { command } => run_sync(command, &context).await,
        Commands::Completions { .. } => Ok(()),
    }
}
