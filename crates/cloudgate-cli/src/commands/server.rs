//! `cloudgate serve`: wires the backends into a gateway and serves stdio.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use cloudgate_gateway::{Gateway, McpServer, SessionRegistry, TerminalPrompt};
use cloudgate_providers::caldav::CalDavConnector;
use cloudgate_providers::mail::ImapSmtpConnector;
use cloudgate_providers::reminders::{FileReminderStore, NativeReminderAdapter};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Serves until stdin closes or the process is interrupted.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let gateway = build_gateway(config)?;
    McpServer::new(Arc::new(gateway)).serve_stdio().await?;
    info!("Server stopped");
    Ok(())
}

/// Sessions for the remote backends. Nothing connects until first use.
pub fn build_sessions(config: &ClientConfig) -> ClientResult<SessionRegistry> {
    let calendar = CalDavConnector::new(config.caldav()?);
    let mail = ImapSmtpConnector::new(config.mail_config());
    let credentials = config.credentials.provider()?;
    info!(
        calendar = %config.calendar.url,
        imap = %config.mail.imap_host,
        credentials = %credentials.describe(),
        "Configured remote backends"
    );
    Ok(SessionRegistry::new(
        Arc::new(calendar),
        Arc::new(mail),
        credentials,
        Arc::new(TerminalPrompt::new()),
        &config.gateway(),
    ))
}

pub fn build_gateway(config: &ClientConfig) -> ClientResult<Gateway> {
    let sessions = build_sessions(config)?;

    let path = config.reminders.resolved_store_path();
    let store = FileReminderStore::open(&path).map_err(|e| {
        ClientError::config(format!("failed to open reminder store {}: {e}", path.display()))
    })?;
    info!(path = %path.display(), "Opened reminder store");
    let reminders = NativeReminderAdapter::new(Arc::new(store))
        .with_timeout(Duration::from_secs(config.reminders.timeout_secs));

    Ok(Gateway::new(sessions, Arc::new(reminders)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgate_gateway::SessionStatus;
    use serde_json::json;

    fn config_in(dir: &tempfile::TempDir) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.reminders.store_path = Some(dir.path().join("reminders.json"));
        config
    }

    #[tokio::test]
    async fn gateway_starts_without_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = build_gateway(&config_in(&dir)).unwrap();
        assert_eq!(
            gateway.sessions().calendar().status().await,
            SessionStatus::Unauthenticated
        );
        assert_eq!(
            gateway.sessions().mail().status().await,
            SessionStatus::Unauthenticated
        );
    }

    #[tokio::test]
    async fn reminder_tools_use_the_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = build_gateway(&config_in(&dir)).unwrap();
        let created = gateway
            .invoke_value("reminders_create_reminder", json!({"title": "Water plants"}))
            .await;
        assert!(!created.is_error(), "{:?}", created.error_message());
        assert!(dir.path().join("reminders.json").exists());
    }

    #[test]
    fn invalid_calendar_url_is_a_config_error() {
        let mut config = ClientConfig::default();
        config.calendar.url = "::".into();
        assert!(matches!(
            build_sessions(&config),
            Err(ClientError::Config(_))
        ));
    }
}
