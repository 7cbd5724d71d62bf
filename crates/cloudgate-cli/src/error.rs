//! Client error types.

use thiserror::Error;

use cloudgate_gateway::{CredentialError, GatewayError};
use cloudgate_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors reported by `cloudgate` commands.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("credential store: {0}")]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{}", .0.envelope_message())]
    Provider(#[from] ProviderError),

    /// One or more backends failed `auth verify`.
    #[error("verification failed for: {0}")]
    Verification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Input(String),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
