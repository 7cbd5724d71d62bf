//! Error types for backend adapter operations.
//!
//! Every failure an adapter, connector or native store can produce is a
//! [`ProviderError`]. The gateway only ever turns these into envelope text via
//! [`ProviderError::envelope_message`], so the class label is the one piece of
//! the message callers and operators can rely on.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No credentials have been stored for the backend.
    NotConfigured,
    /// The backend refused the stored credentials.
    AuthenticationRejected,
    /// The backend wants an extra verification code that was not supplied.
    ChallengeRequired,
    /// The verification code was wrong or never arrived.
    ChallengeFailed,
    /// Access to a local store has not been granted.
    PermissionDenied,
    /// The referenced resource does not exist.
    NotFound,
    /// A caller-supplied argument is missing, malformed or refers to nothing.
    InputInvalid,
    /// Connection, DNS, TLS or protocol transport failure.
    Network,
    /// A bounded wait elapsed.
    Timeout,
    /// Some recipients accepted a message and others rejected it.
    PartialDelivery,
    /// The backend answered with something we could not interpret.
    InvalidResponse,
    /// The backend reported an internal failure (5xx and friends).
    ServerError,
    /// The backend is throttling us.
    RateLimited,
    /// Unexpected state inside cloudgate.
    Internal,
}

impl ProviderErrorCode {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::AuthenticationRejected => "authentication_rejected",
            Self::ChallengeRequired => "challenge_required",
            Self::ChallengeFailed => "challenge_failed",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::InputInvalid => "input_invalid",
            Self::Network => "network_error",
            Self::Timeout => "timeout",
            Self::PartialDelivery => "partial_delivery",
            Self::InvalidResponse => "invalid_response",
            Self::ServerError => "server_error",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal_error",
        }
    }

    /// Short human label used as the prefix of envelope messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::AuthenticationRejected => "authentication rejected",
            Self::ChallengeRequired => "verification required",
            Self::ChallengeFailed => "verification failed",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::InputInvalid => "invalid input",
            Self::Network => "backend unavailable",
            Self::Timeout => "timed out",
            Self::PartialDelivery => "partially delivered",
            Self::InvalidResponse => "invalid backend response",
            Self::ServerError => "backend server error",
            Self::RateLimited => "rate limited",
            Self::Internal => "internal error",
        }
    }

    /// True for the authentication-state-machine failures.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured
                | Self::AuthenticationRejected
                | Self::ChallengeRequired
                | Self::ChallengeFailed
        )
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by a backend adapter, connector or native store.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The backend that raised it ("caldav", "imap", "smtp", "reminders", ...).
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotConfigured, message)
    }

    pub fn authentication_rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationRejected, message)
    }

    pub fn challenge_required(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ChallengeRequired, message)
    }

    pub fn challenge_failed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ChallengeFailed, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// An invalid argument. The message should name the field.
    pub fn input_invalid(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InputInvalid, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    pub fn partial_delivery(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::PartialDelivery, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the provider name only if none is set yet.
    pub fn or_provider(self, provider: &str) -> Self {
        if self.provider.is_some() {
            self
        } else {
            self.with_provider(provider)
        }
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// The text placed in an `{error}` envelope: `<label>: <message>`.
    pub fn envelope_message(&self) -> String {
        format!("{}: {}", self.code.label(), self.message)
    }

    /// A copy without the source chain, for handing the same failure to
    /// several waiters.
    pub fn detached(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            provider: self.provider.clone(),
            source: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
