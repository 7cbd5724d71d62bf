//! `mail_*` tools.

use cloudgate_core::SendReceipt;
use cloudgate_protocol::{ArgumentError, Arguments, MailAction};
use cloudgate_providers::normalize::{normalize_mailbox, normalize_message, normalize_summary};
use cloudgate_providers::{
    MailAdapter, MessageQuery, OutgoingMessage, ProviderResult, split_addresses,
};
use serde_json::Value;
use tracing::debug;

use super::{invalid, optional_str, payload, required_text};

pub(crate) async fn handle(
    action: MailAction,
    mail: &dyn MailAdapter,
    args: &Arguments,
) -> ProviderResult<Value> {
    match action {
        MailAction::ListMailboxes => {
            let mailboxes = mail.list_mailboxes().await?;
            payload(&mailboxes.iter().map(normalize_mailbox).collect::<Vec<_>>())
        }
        MailAction::ListMessages => {
            let query = MessageQuery::new(
                mailbox_arg(args)?,
                args.int_or("limit", MessageQuery::DEFAULT_LIMIT as i64)
                    .map_err(invalid)?,
                args.bool_or("unread_only", false).map_err(invalid)?,
            );
            let limit = query.limit;
            let messages = mail.list_messages(query).await?;
            let summaries: Vec<_> = messages.iter().take(limit).map(normalize_summary).collect();
            payload(&summaries)
        }
        MailAction::GetMessage => {
            let uid = uid_arg(args)?;
            let mailbox = mailbox_arg(args)?;
            let found = mail.fetch_message(mailbox.clone(), uid).await?;
            if found.is_none() {
                debug!(uid, mailbox = %mailbox, "No such message");
            }
            payload(&found.as_ref().map(normalize_message))
        }
        MailAction::SendMessage => {
            let message = outgoing(args)?;
            let message_id = mail.send_message(message).await?;
            payload(&SendReceipt::sent(message_id))
        }
    }
}

fn mailbox_arg(args: &Arguments) -> ProviderResult<String> {
    Ok(optional_str(args, "mailbox")?
        .unwrap_or(MessageQuery::DEFAULT_MAILBOX)
        .to_string())
}

/// Accepts the uid as a number or a numeric string.
fn uid_arg(args: &Arguments) -> ProviderResult<u32> {
    let bad = |problem: String| invalid(ArgumentError::new("uid", problem));
    match args.get("uid") {
        None => Err(invalid(ArgumentError::missing("uid"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| bad(format!("'{n}' is not a message uid"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| bad(format!("'{s}' is not a message uid"))),
        Some(_) => Err(bad("expected a number or a string".to_string())),
    }
}

fn outgoing(args: &Arguments) -> ProviderResult<OutgoingMessage> {
    let list = |field: &str| -> ProviderResult<Vec<String>> {
        Ok(optional_str(args, field)?
            .map(split_addresses)
            .unwrap_or_default())
    };
    let to = list("to")?;
    if to.is_empty() {
        return Err(invalid(ArgumentError::new(
            "to",
            "at least one recipient is required",
        )));
    }
    Ok(OutgoingMessage {
        to,
        cc: list("cc")?,
        bcc: list("bcc")?,
        subject: required_text(args, "subject")?.to_string(),
        body: required_text(args, "body")?.to_string(),
    })
}
