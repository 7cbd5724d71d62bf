//! Adapter traits, connectors and backends.
//!
//! This crate is the layer between the gateway and the remote services:
//!
//! - [`CalendarAdapter`], [`MailAdapter`] and [`ReminderAdapter`] - one
//!   operation contract per resource domain
//! - [`Connector`] - primary authentication, possibly yielding a
//!   [`PendingChallenge`]
//! - [`raw`] - backend records before normalization
//! - [`normalize`] - conversion into the uniform `cloudgate_core` entities
//! - [`ProviderError`] - the single error type every backend reports
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌────────────────┐
//! │ CalDAV server │   │ IMAP / SMTP   │   │ reminder store │
//! └───────┬───────┘   └───────┬───────┘   └───────┬────────┘
//!         │                   │                   │ callbacks
//!         ▼                   ▼                   ▼
//! ┌───────────────┐   ┌───────────────┐   ┌────────────────────────┐
//! │ CalDavCalendar│   │ ImapSmtpMail  │   │ NativeReminderAdapter  │
//! └───────┬───────┘   └───────┬───────┘   └───────┬────────────────┘
//!         │  raw records      │                   │
//!         └───────────────────┼───────────────────┘
//!                             ▼ normalize
//!                  ┌─────────────────────┐
//!                  │ cloudgate_core types │
//!                  └─────────────────────┘
//! ```

pub mod adapter;
#[cfg(feature = "caldav")]
pub mod caldav;
pub mod connect;
pub mod error;
#[cfg(feature = "mail")]
pub mod mail;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod normalize;
pub mod raw;
pub mod reminders;

pub use adapter::{
    BoxFuture, CalendarAdapter, MailAdapter, MessageQuery, NewEvent, NewReminder,
    OutgoingMessage, ReminderAdapter, ReminderPredicate, split_addresses,
};
pub use connect::{
    AuthOutcome, CalendarHandle, Connector, Credentials, DynCalendarConnector, DynMailConnector,
    MailHandle, PendingChallenge,
};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use raw::{
    NativeReminder, NativeReminderList, RawCalendar, RawEvent, RawEventTime, RawMailbox,
    RawMessage, RawMessageFlags,
};
