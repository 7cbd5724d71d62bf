//! Backend records before normalization.
//!
//! Adapters hand these to [`crate::normalize`]; most fields are optional
//! because backends leave them out freely. Nothing here is ever returned to a
//! caller directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The time specification for a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    /// A specific instant.
    DateTime(DateTime<Utc>),
    /// An all-day date.
    Date(NaiveDate),
}

impl RawEventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// A calendar event as parsed from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub start: RawEventTime,
    pub end: RawEventTime,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Identifier of the owning calendar.
    pub calendar_id: String,
    /// `CONFIRMED`, `TENTATIVE`, `CANCELLED`, ...
    pub status: Option<String>,
    /// Resource location of the stored object, when the backend has one.
    pub href: Option<String>,
}

impl RawEvent {
    pub fn new(
        id: impl Into<String>,
        start: RawEventTime,
        end: RawEventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            summary: None,
            description: None,
            location: None,
            calendar_id: calendar_id.into(),
            status: None,
            href: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }
}

/// A calendar collection as discovered on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawCalendar {
    pub id: String,
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    /// The account's designated default calendar for new events.
    pub is_default: bool,
}

impl RawCalendar {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// A mailbox as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMailbox {
    pub name: String,
    pub unseen: Option<u32>,
    pub messages: Option<u32>,
}

/// Flags carried alongside a fetched message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageFlags {
    pub seen: bool,
    pub flagged: bool,
}

/// A fetched message.
///
/// `content` is either the header block alone (listings) or the complete
/// RFC 5322 message (single fetch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub uid: u32,
    pub flags: RawMessageFlags,
    pub content: Vec<u8>,
}

/// A reminder as the native store exposes it.
///
/// Every field may be missing; the normalizer supplies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeReminder {
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub completion_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<i64>,
    pub list_identifier: Option<String>,
}

impl NativeReminder {
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}

/// A reminder list as the native store exposes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeReminderList {
    pub identifier: Option<String>,
    pub title: Option<String>,
}
