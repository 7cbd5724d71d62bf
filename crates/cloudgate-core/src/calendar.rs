//! Uniform calendar entities.
//!
//! These are the shapes every calendar backend is normalized into before a
//! result leaves the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event.
///
/// `start` and `end` are passed through exactly as the backend reports them;
/// no ordering between the two is enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Backend-assigned stable identifier.
    pub uid: String,
    /// Event summary, `(no title)` when the backend has none.
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Free-form location, empty when absent.
    pub location: String,
    /// Free-form description, empty when absent.
    pub description: String,
    /// Identifier of the calendar containing this event.
    #[serde(rename = "calendar")]
    pub calendar_id: String,
}

/// A calendar collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub uid: String,
    pub title: String,
    /// Display color hint such as `#FF2968`.
    pub color: Option<String>,
}
