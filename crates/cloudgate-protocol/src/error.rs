//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing or decoding transport messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Failed to serialize or deserialize JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blank line was received where a message was expected.
    #[error("empty message")]
    EmptyMessage,

    /// The message parsed as JSON but is not a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors produced when resolving a tool name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolNameError {
    /// The prefix before the first `_` is not a known domain.
    #[error("unknown tool domain '{domain}' in '{name}'")]
    UnknownDomain { name: String, domain: String },

    /// The domain is known but the action is not.
    #[error("unknown {domain} action '{action}'")]
    UnknownAction { domain: String, action: String },
}

/// A tool argument that is missing or has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument '{field}': {problem}")]
pub struct ArgumentError {
    /// Name of the offending argument.
    pub field: String,
    /// What is wrong with it.
    pub problem: String,
}

impl ArgumentError {
    pub fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "required argument is missing")
    }
}
