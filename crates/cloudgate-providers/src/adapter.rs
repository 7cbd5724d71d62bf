//! Adapter traits, one per resource domain.
//!
//! Each trait is the fixed operation contract for its domain. Concrete
//! backends implement only protocol I/O and return [`crate::raw`] records;
//! defaults, filtering and normalization live above the trait so that they
//! are shared by every implementation.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use cloudgate_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw::{
    NativeReminder, NativeReminderList, RawCalendar, RawEvent, RawMailbox, RawMessage,
};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so adapters can be selected at
/// configuration time and stored as `Arc<dyn ...>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fields of an event to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Identifier generated by the caller and embedded in the stored record.
    pub uid: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Remote calendar operations.
pub trait CalendarAdapter: Send + Sync {
    /// Backend name used in logs and error context.
    fn name(&self) -> &str;

    /// Lists every calendar that can hold events.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<RawCalendar>>>;

    /// Fetches events overlapping `window`, optionally scoped to one calendar.
    ///
    /// An unknown `calendar_id` yields an empty result.
    fn fetch_events(
        &self,
        window: TimeWindow,
        calendar_id: Option<String>,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;

    /// Stores a new event in `calendar_id` and returns it as stored.
    fn create_event(
        &self,
        calendar_id: String,
        event: NewEvent,
    ) -> BoxFuture<'_, ProviderResult<RawEvent>>;
}

/// Parameters of a message listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub mailbox: String,
    /// Already clamped to [`MessageQuery::MAX_LIMIT`].
    pub limit: usize,
    pub unread_only: bool,
}

impl MessageQuery {
    pub const DEFAULT_MAILBOX: &'static str = "INBOX";
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;

    /// Builds a query, clamping `limit` into `0..=MAX_LIMIT`.
    pub fn new(mailbox: impl Into<String>, limit: i64, unread_only: bool) -> Self {
        let limit = limit.clamp(0, Self::MAX_LIMIT as i64) as usize;
        Self {
            mailbox: mailbox.into(),
            limit,
            unread_only,
        }
    }
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAILBOX, Self::DEFAULT_LIMIT as i64, false)
    }
}

/// A plain-text message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    /// Every envelope recipient, deduplicated, in first-seen order.
    pub fn recipients(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .filter(|addr| seen.insert(addr.to_ascii_lowercase()))
            .collect()
    }
}

/// Splits a comma-separated address list, dropping blanks.
pub fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remote mail operations.
pub trait MailAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn list_mailboxes(&self) -> BoxFuture<'_, ProviderResult<Vec<RawMailbox>>>;

    /// Returns at most `query.limit` messages, newest first, with header
    /// content only.
    fn list_messages(&self, query: MessageQuery) -> BoxFuture<'_, ProviderResult<Vec<RawMessage>>>;

    /// Returns the complete message, or `None` when the mailbox has no such
    /// uid.
    fn fetch_message(
        &self,
        mailbox: String,
        uid: u32,
    ) -> BoxFuture<'_, ProviderResult<Option<RawMessage>>>;

    /// Sends the message and returns the Message-ID it was sent with.
    fn send_message(&self, message: OutgoingMessage) -> BoxFuture<'_, ProviderResult<String>>;
}

/// Which reminders a fetch should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPredicate {
    /// Restrict to these list identifiers; `None` means every list.
    pub lists: Option<Vec<String>>,
    pub include_completed: bool,
}

impl ReminderPredicate {
    pub fn matches(&self, reminder: &NativeReminder) -> bool {
        if !self.include_completed && reminder.is_completed() {
            return false;
        }
        match (&self.lists, &reminder.list_identifier) {
            (None, _) => true,
            (Some(lists), Some(list)) => lists.iter().any(|l| l == list),
            (Some(_), None) => false,
        }
    }
}

/// Fields of a reminder to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub list_id: String,
    pub due: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Already bucketed to 0, 1, 5 or 9.
    pub priority: u8,
}

/// Local reminder store operations.
pub trait ReminderAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn list_lists(&self) -> BoxFuture<'_, ProviderResult<Vec<NativeReminderList>>>;

    /// The list new reminders go to when none is named.
    fn default_list(&self) -> BoxFuture<'_, ProviderResult<Option<NativeReminderList>>>;

    fn fetch_reminders(
        &self,
        predicate: ReminderPredicate,
    ) -> BoxFuture<'_, ProviderResult<Vec<NativeReminder>>>;

    fn create_reminder(&self, reminder: NewReminder)
    -> BoxFuture<'_, ProviderResult<NativeReminder>>;

    /// Marks the reminder complete. Returns `false` when no reminder has
    /// that identifier.
    fn complete_reminder(&self, uid: String) -> BoxFuture<'_, ProviderResult<bool>>;
}
