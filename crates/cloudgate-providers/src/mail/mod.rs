//! IMAP + SMTP mail backend.
//!
//! Reading uses a blocking IMAP client on tokio's blocking pool, one
//! connection per call. Sending uses lettre's async SMTP transport with
//! STARTTLS.

mod account;
mod config;
mod imap;
mod smtp;

pub use account::{ImapSmtpConnector, ImapSmtpMail};
pub use config::MailConfig;
pub use smtp::{compose, message_id_for};
