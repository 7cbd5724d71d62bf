//! Uniform mail entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing-level view of a message.
///
/// `uid` is only meaningful inside the mailbox it was listed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub uid: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: Option<DateTime<Utc>>,
    pub read: bool,
    pub flagged: bool,
    pub has_attachments: bool,
}

/// A message with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(flatten)]
    pub summary: MessageSummary,
    pub body: String,
}

/// A mailbox (folder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Always `"sent"`.
    pub status: String,
    pub message_id: String,
}

impl SendReceipt {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            status: "sent".to_string(),
            message_id: message_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> MessageSummary {
        MessageSummary {
            uid: "42".into(),
            subject: "hello".into(),
            from: "a@example.com".into(),
            to: "b@example.com".into(),
            date: None,
            read: false,
            flagged: true,
            has_attachments: false,
        }
    }

    #[test]
    fn message_flattens_summary() {
        let msg = Message {
            summary: summary(),
            body: "hi there".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["uid"], "42");
        assert_eq!(json["body"], "hi there");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn mailbox_counts_omitted_when_unknown() {
        let mb = Mailbox {
            name: "Archive".into(),
            unread: None,
            total: Some(10),
        };
        let json = serde_json::to_value(&mb).unwrap();
        assert!(json.get("unread").is_none());
        assert_eq!(json["total"], 10);
    }

    #[test]
    fn receipt_status_is_sent() {
        let receipt = SendReceipt::sent("<abc@example.com>");
        assert_eq!(receipt.status, "sent");
    }
}
