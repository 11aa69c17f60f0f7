//! examsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use examsync_client::cli::{AuthAction, Cli, Command, ConfigAction};
use examsync_client::commands;
use examsync_client::config::ClientConfig;
use examsync_client::error::{ClientError, ClientResult};
use examsync_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)
    } else {
        ClientConfig::load()
    }
    .map_err(ClientError::Config)?;

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug || config.debug)) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Command::Sync { input, dry_run } => commands::sync::run(&config, &input, dry_run).await,
        Command::Auth { action } => match action {
            AuthAction::Status => commands::auth::status(&config),
            AuthAction::Refresh => commands::auth::refresh(&config).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
