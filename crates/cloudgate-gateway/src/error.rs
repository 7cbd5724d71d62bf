//! Gateway error types.

use std::io;
use thiserror::Error;

/// Result type for gateway startup and transport operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors outside a single tool call.
///
/// Failures inside a tool call never use this type; they become an error
/// envelope instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// IO error on the transport.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Framing or encoding error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] cloudgate_protocol::ProtocolError),

    /// The credential store could not be read or written.
    #[error("Credential store error: {0}")]
    Credentials(#[from] crate::credentials::CredentialError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
