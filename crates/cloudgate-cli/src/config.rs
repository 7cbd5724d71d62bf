//! Client configuration.
//!
//! All settings live in `~/.config/cloudgate/config.toml`. Every section is
//! optional and falls back to the iCloud defaults.
//!
//! `credentials.identifier` and `credentials.secret` accept secret references
//! (`pass::…`, `env::…`); when both are set they replace the keyring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cloudgate_core::{TracingConfig, TracingOutputFormat};
use cloudgate_gateway::{
    CredentialProvider, DEFAULT_SERVICE, GatewayConfig, KeyringCredentials, StaticCredentials,
};
use cloudgate_providers::Credentials;
use cloudgate_providers::caldav::CalDavConfig;
use cloudgate_providers::mail::MailConfig;

use crate::error::{ClientError, ClientResult};
use crate::secret;

const CONFIG_DIR: &str = "cloudgate";
const REDACTED: &str = "<redacted>";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub calendar: CalendarSettings,
    pub mail: MailSettings,
    pub reminders: ReminderSettings,
    pub credentials: CredentialSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// `[calendar]`: the CalDAV server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Discovery URL.
    pub url: String,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            url: CalDavConfig::DEFAULT_URL.to_string(),
            timeout_secs: CalDavConfig::DEFAULT_TIMEOUT_SECS,
            verify_tls: true,
        }
    }
}

/// `[mail]`: IMAP and SMTP endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap_host: MailConfig::DEFAULT_IMAP_HOST.to_string(),
            imap_port: MailConfig::DEFAULT_IMAP_PORT,
            smtp_host: MailConfig::DEFAULT_SMTP_HOST.to_string(),
            smtp_port: MailConfig::DEFAULT_SMTP_PORT,
            timeout_secs: MailConfig::DEFAULT_TIMEOUT_SECS,
            verify_tls: true,
        }
    }
}

/// `[reminders]`: the local reminder store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// Defaults to `<data_dir>/cloudgate/reminders.json`.
    pub store_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            timeout_secs: 30,
        }
    }
}

impl ReminderSettings {
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("reminders.json"))
    }
}

/// `[credentials]`: keyring namespace and optional inline overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            identifier: None,
            secret: None,
        }
    }
}

impl CredentialSettings {
    /// Resolves the inline credentials, if both values are configured.
    pub fn resolve_inline(&self) -> ClientResult<Option<Credentials>> {
        let (Some(identifier), Some(secret)) = (&self.identifier, &self.secret) else {
            if self.identifier.is_some() != self.secret.is_some() {
                return Err(ClientError::config(
                    "[credentials] needs both `identifier` and `secret`, or neither",
                ));
            }
            return Ok(None);
        };
        let identifier = secret::resolve(identifier)
            .map_err(|e| ClientError::config(format!("failed to resolve identifier: {e}")))?;
        let secret = secret::resolve(secret)
            .map_err(|e| ClientError::config(format!("failed to resolve secret: {e}")))?;
        Ok(Some(Credentials::new(identifier, secret)))
    }

    /// The provider the gateway should read credentials from.
    pub fn provider(&self) -> ClientResult<Arc<dyn CredentialProvider>> {
        Ok(match self.resolve_inline()? {
            Some(credentials) => Arc::new(StaticCredentials::new(credentials)),
            None => Arc::new(KeyringCredentials::new(&self.service)),
        })
    }
}

/// `[auth]`: verification-code challenge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub challenge_timeout_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            challenge_timeout_secs: GatewayConfig::default().challenge_timeout.as_secs(),
        }
    }
}

/// `[logging]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `pretty`, `compact` or `json`.
    pub format: String,
    pub debug: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
            debug: false,
        }
    }
}

impl LoggingSettings {
    pub fn output_format(&self) -> ClientResult<TracingOutputFormat> {
        self.format.parse().map_err(ClientError::Config)
    }
}

impl ClientConfig {
    /// Loads the default file, or defaults when it does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
    }

    pub fn caldav(&self) -> ClientResult<CalDavConfig> {
        let settings = &self.calendar;
        let config = CalDavConfig::new(&settings.url).map_err(|e| {
            ClientError::config(format!("invalid calendar url '{}': {e}", settings.url))
        })?;
        let config = config.with_timeout(Duration::from_secs(settings.timeout_secs));
        Ok(if settings.verify_tls {
            config
        } else {
            config.with_insecure_tls()
        })
    }

    pub fn mail_config(&self) -> MailConfig {
        let settings = &self.mail;
        let config = MailConfig::default()
            .with_imap(&settings.imap_host, settings.imap_port)
            .with_smtp(&settings.smtp_host, settings.smtp_port)
            .with_timeout(Duration::from_secs(settings.timeout_secs));
        if settings.verify_tls {
            config
        } else {
            config.with_insecure_tls()
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig::default()
            .with_service(&self.credentials.service)
            .with_challenge_timeout(Duration::from_secs(self.auth.challenge_timeout_secs))
    }

    /// Log setup for a command. `--debug` or `logging.debug` raises the level.
    pub fn tracing(&self, debug: bool, serving: bool) -> ClientResult<TracingConfig> {
        let base = if debug || self.logging.debug {
            TracingConfig::cli_debug()
        } else if serving {
            TracingConfig::serve()
        } else {
            TracingConfig::default()
        };
        Ok(base.with_format(self.logging.output_format()?))
    }

    /// Checks every value that would only fail later at connect time.
    pub fn validate(&self) -> ClientResult<()> {
        self.caldav()?;
        if self.mail.imap_host.trim().is_empty() || self.mail.smtp_host.trim().is_empty() {
            return Err(ClientError::config("mail hosts must not be empty"));
        }
        if self.mail.imap_port == 0 || self.mail.smtp_port == 0 {
            return Err(ClientError::config("mail ports must not be 0"));
        }
        let timeouts = [
            ("calendar.timeout_secs", self.calendar.timeout_secs),
            ("mail.timeout_secs", self.mail.timeout_secs),
            ("reminders.timeout_secs", self.reminders.timeout_secs),
            ("auth.challenge_timeout_secs", self.auth.challenge_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ClientError::config(format!("{name} must be greater than 0")));
        }
        if self.credentials.service.trim().is_empty() {
            return Err(ClientError::config("credentials.service must not be empty"));
        }
        self.logging.output_format()?;
        self.credentials.resolve_inline()?;
        Ok(())
    }

    /// A copy safe to print: literal secrets are masked, references are kept.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(secret) = copy.credentials.secret.as_mut()
            && !secret::is_reference(secret)
        {
            *secret = REDACTED.to_string();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_icloud_defaults() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.calendar.url, "https://caldav.icloud.com/");
        assert_eq!(config.mail.imap_port, 993);
        assert_eq!(config.mail.smtp_host, "smtp.mail.me.com");
        assert_eq!(config.credentials.service, "cloudgate");
        assert_eq!(config.auth.challenge_timeout_secs, 30);
        assert!(
            config
                .reminders
                .resolved_store_path()
                .ends_with("cloudgate/reminders.json")
        );
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ClientConfig::parse(
            r#"
[calendar]
url = "https://caldav.example.com/dav/"

[mail]
imap_host = "imap.example.com"

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.calendar.timeout_secs, 30);
        assert_eq!(config.mail.imap_port, 993);
        assert_eq!(config.mail_config().imap_host, "imap.example.com");
        assert_eq!(
            config.caldav().unwrap().url.as_str(),
            "https://caldav.example.com/dav/"
        );
        assert_eq!(
            config.logging.output_format().unwrap(),
            TracingOutputFormat::Json
        );
    }

    #[test]
    fn validation_catches_bad_values() {
        let bad_url = ClientConfig::parse("[calendar]\nurl = \"not a url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let zero = ClientConfig::parse("[auth]\nchallenge_timeout_secs = 0\n").unwrap();
        let err = zero.validate().unwrap_err().to_string();
        assert!(err.contains("auth.challenge_timeout_secs"), "{err}");

        let format = ClientConfig::parse("[logging]\nformat = \"xml\"\n").unwrap();
        assert!(format.validate().is_err());

        let half = ClientConfig::parse("[credentials]\nidentifier = \"me@example.com\"\n").unwrap();
        assert!(half.validate().is_err());
    }

    #[test]
    fn inline_credentials_resolve_references() {
        unsafe {
            std::env::set_var("_CLOUDGATE_CFG_SECRET", "abcd-efgh");
        }
        let config = ClientConfig::parse(
            r#"
[credentials]
identifier = "me@example.com"
secret = "env::_CLOUDGATE_CFG_SECRET"
"#,
        )
        .unwrap();
        let creds = config.credentials.resolve_inline().unwrap().unwrap();
        assert_eq!(creds, Credentials::new("me@example.com", "abcd-efgh"));
        assert_eq!(
            config.credentials.provider().unwrap().describe(),
            "the configuration file"
        );
        unsafe {
            std::env::remove_var("_CLOUDGATE_CFG_SECRET");
        }
    }

    #[test]
    fn keyring_is_used_without_inline_credentials() {
        let config = ClientConfig::parse("[credentials]\nservice = \"work\"\n").unwrap();
        assert_eq!(
            config.credentials.provider().unwrap().describe(),
            "service 'work'"
        );
        assert_eq!(config.gateway().service, "work");
    }

    #[test]
    fn redaction_masks_literal_secrets_only() {
        let mut config = ClientConfig::default();
        config.credentials.identifier = Some("me@example.com".into());
        config.credentials.secret = Some("plain-secret".into());
        let dumped = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!dumped.contains("plain-secret"));
        assert!(dumped.contains(REDACTED));

        config.credentials.secret = Some("pass::icloud/app".into());
        assert_eq!(
            config.redacted().credentials.secret.as_deref(),
            Some("pass::icloud/app")
        );
    }

    #[test]
    fn load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[mail]\nimap_port = \"x\"\n").unwrap();
        let err = ClientConfig::load_from(&path).unwrap_err().to_string();
        assert!(err.contains("config.toml"), "{err}");

        std::fs::write(&path, "[mail]\nsmtp_port = 2525\n").unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap().mail.smtp_port, 2525);
    }
}
