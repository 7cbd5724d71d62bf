//! Resource gateway for calendar, mail and reminder tools.
//!
//! This crate wires the pieces between a tool call and a backend:
//! - [`CredentialProvider`] - account credentials from the keyring or config
//! - [`SessionRegistry`] - one lazily authenticated session per remote backend,
//!   including the verification-code challenge
//! - [`Gateway`] - `invoke(tool, arguments) -> Envelope`
//! - [`McpServer`] - the stdio JSON-RPC loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudgate_gateway::{Gateway, McpServer};
//!
//! async fn serve(gateway: Gateway) -> Result<(), Box<dyn std::error::Error>> {
//!     McpServer::new(Arc::new(gateway)).serve_stdio().await?;
//!     Ok(())
//! }
//! ```

mod challenge;
mod config;
mod credentials;
mod error;
mod gateway;
mod handlers;
mod server;
mod session;

pub use challenge::{ChallengePrompt, NoPrompt, TerminalPrompt};
pub use config::GatewayConfig;
pub use credentials::{
    ACCOUNT_KEY, CredentialError, CredentialProvider, DEFAULT_SERVICE, KeyringCredentials,
    SECRET_KEY, StaticCredentials,
};
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use server::{McpServer, SERVER_NAME};
pub use session::{Session, SessionContext, SessionRegistry, SessionStatus};
