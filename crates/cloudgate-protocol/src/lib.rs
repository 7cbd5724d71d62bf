//! Wire-level types for the cloudgate tool surface.
//!
//! # Tools
//!
//! A tool name is `<domain>_<action>`, for example `calendar_list_events`.
//! [`Tool`] parses names into a domain and action; [`catalog::tools`] lists
//! all twelve with their parameter schemas.
//!
//! # Results
//!
//! Every tool call produces exactly one [`Envelope`]: either the success
//! payload itself (an entity, an array, or `null`) or `{"error": "..."}`.
//!
//! # Transport
//!
//! The stdio server speaks JSON-RPC 2.0 with one message per line; see
//! [`framing`] and [`jsonrpc`].
//!
//! ```rust
//! use cloudgate_protocol::{Tool, Domain};
//!
//! let tool: Tool = "mail_list_messages".parse().unwrap();
//! assert_eq!(tool.domain(), Domain::Mail);
//! ```

mod args;
pub mod catalog;
mod error;
pub mod framing;
pub mod jsonrpc;
mod types;

pub use args::Arguments;
pub use catalog::{ToolDescriptor, tools};
pub use error::{ArgumentError, ProtocolError, ProtocolResult, ToolNameError};
pub use framing::{LineReader, LineWriter, decode_line, encode_line};
pub use types::{
    CalendarAction, Domain, Envelope, ErrorBody, MailAction, ReminderAction, Tool,
};

/// Maximum size of one framed message (8 MiB).
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;
