//! Gateway configuration.

use std::time::Duration;

use crate::credentials::DEFAULT_SERVICE;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Credential store namespace.
    pub service: String,

    /// How long to wait for a verification code.
    pub challenge_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            challenge_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Builder: set the credential service namespace.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Builder: set the verification code timeout.
    pub fn with_challenge_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self
    }
}
