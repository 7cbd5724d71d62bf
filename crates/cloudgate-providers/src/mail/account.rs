//! IMAP + SMTP implementation of [`MailAdapter`] and its connector.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::info;

use crate::adapter::{BoxFuture, MailAdapter, MessageQuery, OutgoingMessage};
use crate::connect::{AuthOutcome, Connector, Credentials, MailHandle};
use crate::error::{ProviderError, ProviderResult};
use crate::raw::{RawMailbox, RawMessage};

use super::config::MailConfig;
use super::imap::ImapSession;
use super::smtp;

const BACKEND: &str = "imap";

/// An account whose credentials were accepted by the IMAP server.
///
/// Uids are IMAP UIDs, meaningful only within their mailbox.
pub struct ImapSmtpMail {
    config: Arc<MailConfig>,
    credentials: Arc<Credentials>,
}

impl ImapSmtpMail {
    /// Runs `op` on a fresh IMAP session on the blocking pool.
    async fn with_session<T, F>(&self, op: F) -> ProviderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> ProviderResult<T> + Send + 'static,
    {
        let config = Arc::clone(&self.config);
        let credentials = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || {
            let mut session = ImapSession::open(&config, &credentials)?;
            let result = op(&mut session);
            session.logout();
            result
        })
        .await
        .map_err(|e| ProviderError::internal(format!("mail worker failed: {}", e)))?
        .map_err(|e| e.or_provider(BACKEND))
    }
}

impl MailAdapter for ImapSmtpMail {
    fn name(&self) -> &str {
        BACKEND
    }

    fn list_mailboxes(&self) -> BoxFuture<'_, ProviderResult<Vec<RawMailbox>>> {
        Box::pin(self.with_session(|s| s.list_mailboxes()))
    }

    fn list_messages(&self, query: MessageQuery) -> BoxFuture<'_, ProviderResult<Vec<RawMessage>>> {
        Box::pin(self.with_session(move |s| s.list_messages(&query)))
    }

    fn fetch_message(
        &self,
        mailbox: String,
        uid: u32,
    ) -> BoxFuture<'_, ProviderResult<Option<RawMessage>>> {
        Box::pin(self.with_session(move |s| s.fetch_message(&mailbox, uid)))
    }

    fn send_message(&self, message: OutgoingMessage) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let message_id = smtp::message_id_for(&self.credentials);
            let composed = smtp::compose(
                &self.credentials.identifier,
                &message,
                &message_id,
                SystemTime::now(),
            )?;
            smtp::submit(&self.config, &self.credentials, composed)
                .await
                .map_err(|e| e.or_provider("smtp"))?;
            info!(recipients = message.recipients().len(), "Message sent");
            Ok(message_id)
        })
    }
}

/// Verifies mail credentials with one IMAP login. App-specific passwords
/// never trigger a verification challenge.
pub struct ImapSmtpConnector {
    config: Arc<MailConfig>,
}

impl ImapSmtpConnector {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Connector for ImapSmtpConnector {
    type Handle = MailHandle;

    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn connect(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, ProviderResult<AuthOutcome<Self::Handle>>> {
        Box::pin(async move {
            let mail = ImapSmtpMail {
                config: Arc::clone(&self.config),
                credentials: Arc::new(credentials),
            };
            mail.with_session(|_| Ok(())).await?;
            let handle: MailHandle = Arc::new(mail);
            Ok(AuthOutcome::Authenticated(handle))
        })
    }
}
