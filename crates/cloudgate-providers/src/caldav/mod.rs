//! CalDAV calendar backend.
//!
//! - HTTP Digest and Basic authentication
//! - principal, calendar home and default calendar discovery via PROPFIND
//! - event queries via `calendar-query` REPORT with recurrence expansion
//! - event creation via conditional PUT

mod auth;
mod calendar;
mod client;
mod config;
mod ics;
mod xml;

pub use calendar::{CalDavCalendar, CalDavConnector, CalendarHome};
pub use config::CalDavConfig;
