//! Core types: uniform entities, time parsing, tracing

pub mod calendar;
pub mod mail;
pub mod reminder;
pub mod time;
pub mod tracing;

pub use calendar::{Calendar, Event};
pub use mail::{Mailbox, Message, MessageSummary, SendReceipt};
pub use reminder::{CompletionResult, Reminder, ReminderList, ReminderPriority};
pub use time::{TimeParseError, TimeWindow, parse_instant, parse_instant_in};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
