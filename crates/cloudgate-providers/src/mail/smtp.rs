//! Message composition and SMTP submission.

use std::time::SystemTime;

use lettre::address::{Address, Envelope};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::adapter::OutgoingMessage;
use crate::connect::Credentials;
use crate::error::{ProviderError, ProviderResult};

use super::config::MailConfig;

const FALLBACK_DOMAIN: &str = "cloudgate.local";

/// Generates `<uuid@domain>` using the account's domain.
pub fn message_id_for(credentials: &Credentials) -> String {
    let domain = credentials.domain().unwrap_or(FALLBACK_DOMAIN);
    format!("<{}@{}>", uuid::Uuid::new_v4(), domain)
}

fn parse_address(field: &str, value: &str) -> ProviderResult<Address> {
    value.parse::<Address>().map_err(|_| {
        ProviderError::input_invalid(format!(
            "invalid argument '{}': '{}' is not a valid address",
            field, value
        ))
    })
}

fn parse_all(field: &str, values: &[String]) -> ProviderResult<Vec<Address>> {
    values.iter().map(|v| parse_address(field, v)).collect()
}

/// Builds the message and its explicit envelope.
///
/// Bcc recipients appear only in the envelope.
pub fn compose(
    from: &str,
    message: &OutgoingMessage,
    message_id: &str,
    date: SystemTime,
) -> ProviderResult<Message> {
    if message.to.is_empty() {
        return Err(ProviderError::input_invalid(
            "invalid argument 'to': at least one recipient is required",
        ));
    }

    let sender = parse_address("from", from)?;
    let to = parse_all("to", &message.to)?;
    let cc = parse_all("cc", &message.cc)?;
    parse_all("bcc", &message.bcc)?;

    let recipients = message
        .recipients()
        .into_iter()
        .map(|r| parse_address("to", r))
        .collect::<ProviderResult<Vec<_>>>()?;
    let envelope = Envelope::new(Some(sender.clone()), recipients)
        .map_err(|e| ProviderError::input_invalid(format!("invalid recipients: {}", e)))?;

    let mut builder = Message::builder()
        .from(Mailbox::new(None, sender))
        .subject(message.subject.as_str())
        .date(date)
        .message_id(Some(message_id.to_string()))
        .envelope(envelope);
    for address in to {
        builder = builder.to(Mailbox::new(None, address));
    }
    for address in cc {
        builder = builder.cc(Mailbox::new(None, address));
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| ProviderError::input_invalid(format!("cannot build message: {}", e)))
}

/// Submits over STARTTLS with the account credentials.
pub async fn submit(
    config: &MailConfig,
    credentials: &Credentials,
    message: Message,
) -> ProviderResult<()> {
    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(smtp_error)?
        .port(config.smtp_port)
        .credentials(SmtpCredentials::new(
            credentials.identifier.clone(),
            credentials.secret.clone(),
        ))
        .timeout(Some(config.timeout))
        .build();

    let response = transport.send(message).await.map_err(smtp_error)?;
    debug!(code = %response.code(), "SMTP server accepted message");
    Ok(())
}

fn smtp_error(e: lettre::transport::smtp::Error) -> ProviderError {
    if e.is_timeout() {
        return ProviderError::timeout("mail server did not respond in time").with_source(e);
    }
    let code = e.status().map(|c| c.to_string());
    match code.as_deref() {
        Some("535") | Some("534") => {
            ProviderError::authentication_rejected("mail server rejected the credentials")
                .with_source(e)
        }
        _ if e.is_permanent() || e.is_transient() => {
            ProviderError::network(format!("mail server refused the message: {}", e))
                .with_source(e)
        }
        _ => ProviderError::network(format!("mail submission failed: {}", e)).with_source(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    fn outgoing() -> OutgoingMessage {
        OutgoingMessage {
            to: vec!["x@y.com".into()],
            cc: vec!["c@y.com".into()],
            bcc: vec!["hidden@y.com".into()],
            subject: "hi".into(),
            body: "test".into(),
        }
    }

    #[test]
    fn message_id_uses_account_domain() {
        let id = message_id_for(&Credentials::new("a@example.com", "s"));
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));

        let id = message_id_for(&Credentials::new("plain", "s"));
        assert!(id.ends_with("@cloudgate.local>"));
    }

    #[test]
    fn bcc_is_envelope_only() {
        let message = compose("a@example.com", &outgoing(), "<1@example.com>", SystemTime::now())
            .unwrap();
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(recipients, vec!["x@y.com", "c@y.com", "hidden@y.com"]);

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Message-ID: <1@example.com>"));
        assert!(formatted.contains("To: x@y.com"));
        assert!(formatted.contains("Cc: c@y.com"));
        assert!(formatted.contains("Date: "));
        assert!(!formatted.contains("hidden@y.com"));
    }

    #[test]
    fn invalid_address_names_field() {
        let mut msg = outgoing();
        msg.cc = vec!["not an address".into()];
        let err = compose("a@example.com", &msg, "<1@x>", SystemTime::now()).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InputInvalid);
        assert!(err.message().contains("'cc'"));
    }

    #[test]
    fn missing_recipients_rejected() {
        let mut msg = outgoing();
        msg.to.clear();
        let err = compose("a@example.com", &msg, "<1@x>", SystemTime::now()).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InputInvalid);
        assert!(err.message().contains("'to'"));
    }
}
