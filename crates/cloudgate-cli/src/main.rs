//! cloudgate CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use cloudgate_cli::cli::{AuthAction, Cli, Command, ConfigAction};
use cloudgate_cli::commands;
use cloudgate_cli::config::ClientConfig;
use cloudgate_cli::error::ClientResult;
use cloudgate_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    // Logs go to stderr; stdout belongs to the JSON-RPC stream when serving.
    let serving = matches!(cli.command, Command::Serve);
    if let Err(e) = init_tracing(config.tracing(cli.debug, serving)?) {
        eprintln!("warning: {e}");
    }

    match cli.command {
        Command::Serve => commands::server::run(&config).await,
        Command::Auth { action } => match action {
            AuthAction::Store { account, secret } => {
                commands::auth::store(account, secret, &config)
            }
            AuthAction::Verify => commands::auth::verify(&config).await,
            AuthAction::Clear => commands::auth::clear(&config),
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &path),
        },
    }
}
