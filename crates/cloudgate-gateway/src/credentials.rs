//! Credential Provider: where account credentials come from.
//!
//! The keyring layout is one service namespace holding two entries, the
//! account identifier under [`ACCOUNT_KEY`] and the secret under
//! [`SECRET_KEY`]. Either entry missing means "not configured".

use cloudgate_providers::Credentials;
use thiserror::Error;
use tracing::debug;

/// Keyring service used when none is configured.
pub const DEFAULT_SERVICE: &str = "cloudgate";
/// Entry holding the account identifier.
pub const ACCOUNT_KEY: &str = "account_id";
/// Entry holding the secret (an app-specific password).
pub const SECRET_KEY: &str = "app_password";

/// The credential store itself failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CredentialError {
    message: String,
}

impl CredentialError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Looks up the account credentials.
pub trait CredentialProvider: Send + Sync {
    /// Returns `None` when no credentials are stored.
    fn lookup(&self) -> Result<Option<Credentials>, CredentialError>;

    /// Names the store in "not configured" messages.
    fn describe(&self) -> String;
}

/// Credentials in the platform keyring.
#[derive(Debug, Clone)]
pub struct KeyringCredentials {
    service: String,
}

impl Default for KeyringCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyringCredentials {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| CredentialError::new(format!("failed to open keyring entry '{key}': {e}")))
    }

    fn read(&self, key: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(key)?.get_password() {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::new(format!(
                "failed to read keyring entry '{key}': {e}"
            ))),
        }
    }

    /// Writes both entries.
    pub fn store(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        for (key, value) in [
            (ACCOUNT_KEY, &credentials.identifier),
            (SECRET_KEY, &credentials.secret),
        ] {
            self.entry(key)?.set_password(value).map_err(|e| {
                CredentialError::new(format!("failed to write keyring entry '{key}': {e}"))
            })?;
        }
        debug!(service = %self.service, account = %credentials.identifier, "Stored credentials");
        Ok(())
    }

    /// Deletes both entries. Missing entries are ignored.
    pub fn clear(&self) -> Result<(), CredentialError> {
        for key in [ACCOUNT_KEY, SECRET_KEY] {
            match self.entry(key)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    return Err(CredentialError::new(format!(
                        "failed to delete keyring entry '{key}': {e}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl CredentialProvider for KeyringCredentials {
    fn lookup(&self) -> Result<Option<Credentials>, CredentialError> {
        let Some(identifier) = self.read(ACCOUNT_KEY)? else {
            return Ok(None);
        };
        let Some(secret) = self.read(SECRET_KEY)? else {
            return Ok(None);
        };
        debug!(service = %self.service, account = %identifier, "Loaded credentials from keyring");
        Ok(Some(Credentials::new(identifier, secret)))
    }

    fn describe(&self) -> String {
        format!("service '{}'", self.service)
    }
}

/// Credentials fixed at startup, e.g. from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credentials: Option<Credentials>,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// A provider that is never configured.
    pub fn none() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn lookup(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.credentials.clone())
    }

    fn describe(&self) -> String {
        "the configuration file".to_string()
    }
}
