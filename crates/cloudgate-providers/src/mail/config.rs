//! IMAP and SMTP connection settings.

use std::time::Duration;

/// Hosts and ports for the mail account. Credentials come from the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub imap_host: String,
    /// Implicit TLS port.
    pub imap_port: u16,
    pub smtp_host: String,
    /// Submission port, upgraded with STARTTLS.
    pub smtp_port: u16,
    pub timeout: Duration,
    pub verify_tls: bool,
}

impl MailConfig {
    pub const DEFAULT_IMAP_HOST: &'static str = "imap.mail.me.com";
    pub const DEFAULT_IMAP_PORT: u16 = 993;
    pub const DEFAULT_SMTP_HOST: &'static str = "smtp.mail.me.com";
    pub const DEFAULT_SMTP_PORT: u16 = 587;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn with_imap(mut self, host: impl Into<String>, port: u16) -> Self {
        self.imap_host = host.into();
        self.imap_port = port;
        self
    }

    pub fn with_smtp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            imap_host: Self::DEFAULT_IMAP_HOST.to_string(),
            imap_port: Self::DEFAULT_IMAP_PORT,
            smtp_host: Self::DEFAULT_SMTP_HOST.to_string(),
            smtp_port: Self::DEFAULT_SMTP_PORT,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            verify_tls: true,
        }
    }
}
