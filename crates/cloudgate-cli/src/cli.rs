//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cloudgate - calendar, mail and reminders as MCP tools
#[derive(Debug, Parser)]
#[command(name = "cloudgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CLOUDGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the tools over stdio (JSON-RPC, one message per line)
    Serve,

    /// Manage the stored account credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Credential store actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Store the account identifier and app-specific password in the keyring
    Store {
        /// Account identifier (usually the account email address)
        #[arg(long)]
        account: Option<String>,

        /// App-specific password, or a `pass::` / `env::` reference to it
        #[arg(long)]
        secret: Option<String>,
    },

    /// Check the stored credentials against the calendar and mail servers
    Verify,

    /// Remove the stored credentials
    Clear,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
