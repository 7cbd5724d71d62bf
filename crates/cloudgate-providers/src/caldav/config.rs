//! CalDAV connection settings.

use std::time::Duration;
use url::Url;

/// Where and how to reach the CalDAV server.
///
/// Credentials are not part of the configuration; they are supplied per
/// connection by the gateway's credential provider.
#[derive(Debug, Clone)]
pub struct CalDavConfig {
    /// Discovery entry point. The principal and calendar home are found
    /// from here.
    pub url: Url,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub user_agent: String,
}

impl CalDavConfig {
    pub const DEFAULT_URL: &'static str = "https://caldav.icloud.com/";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given discovery URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url.as_ref())?,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("cloudgate/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolves a server href against the discovery URL.
    pub fn resolve(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            self.url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string())
        }
    }
}
