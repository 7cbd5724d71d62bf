//! The `cloudgate` command-line interface.
//!
//! `cloudgate serve` exposes the gateway's tools over stdio; `auth` and
//! `config` manage what the server runs with.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
