//! Tool names and the result envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolNameError;

/// The result of one tool call.
///
/// Serializes either as the bare success payload or as `{"error": "..."}`.
/// A `null` success payload is how an absent entity is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    /// An error object carrying a human-readable message.
    Error(ErrorBody),
    /// An entity, an array of entities, or `null`.
    Success(Value),
}

/// The `{error}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorBody {
    pub error: String,
}

impl Envelope {
    /// Wraps a serializable payload.
    ///
    /// A payload that cannot be serialized turns into an error envelope.
    pub fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self::Success(value),
            Err(e) => Self::error(format!("internal error: failed to encode result: {e}")),
        }
    }

    /// Creates an error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            error: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the error message, if this is an error envelope.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(body) => Some(&body.error),
            Self::Success(_) => None,
        }
    }

    /// Returns the success payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Converts to a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Error(body) => serde_json::json!({ "error": body.error }),
        }
    }

    /// Renders the envelope as indented JSON text.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_else(|_| self.to_value().to_string())
    }
}

/// A resource domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Calendar,
    Mail,
    Reminders,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Mail => "mail",
            Self::Reminders => "reminders",
        }
    }

    /// Whether tools in this domain need an authenticated remote session.
    pub fn requires_session(self) -> bool {
        matches!(self, Self::Calendar | Self::Mail)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarAction {
    ListCalendars,
    ListEvents,
    GetEvent,
    CreateEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailAction {
    ListMailboxes,
    ListMessages,
    GetMessage,
    SendMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderAction {
    ListLists,
    ListReminders,
    CreateReminder,
    CompleteReminder,
}

/// A resolved tool: a domain plus one of its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Calendar(CalendarAction),
    Mail(MailAction),
    Reminders(ReminderAction),
}

impl Tool {
    /// Every tool, in catalogue order.
    pub const ALL: [Tool; 12] = [
        Tool::Calendar(CalendarAction::ListCalendars),
        Tool::Calendar(CalendarAction::ListEvents),
        Tool::Calendar(CalendarAction::GetEvent),
        Tool::Calendar(CalendarAction::CreateEvent),
        Tool::Mail(MailAction::ListMailboxes),
        Tool::Mail(MailAction::ListMessages),
        Tool::Mail(MailAction::GetMessage),
        Tool::Mail(MailAction::SendMessage),
        Tool::Reminders(ReminderAction::ListLists),
        Tool::Reminders(ReminderAction::ListReminders),
        Tool::Reminders(ReminderAction::CreateReminder),
        Tool::Reminders(ReminderAction::CompleteReminder),
    ];

    pub fn domain(self) -> Domain {
        match self {
            Self::Calendar(_) => Domain::Calendar,
            Self::Mail(_) => Domain::Mail,
            Self::Reminders(_) => Domain::Reminders,
        }
    }

    /// The action part of the name (after `<domain>_`).
    pub fn action(self) -> &'static str {
        match self {
            Self::Calendar(CalendarAction::ListCalendars) => "list_calendars",
            Self::Calendar(CalendarAction::ListEvents) => "list_events",
            Self::Calendar(CalendarAction::GetEvent) => "get_event",
            Self::Calendar(CalendarAction::CreateEvent) => "create_event",
            Self::Mail(MailAction::ListMailboxes) => "list_mailboxes",
            Self::Mail(MailAction::ListMessages) => "list_messages",
            Self::Mail(MailAction::GetMessage) => "get_message",
            Self::Mail(MailAction::SendMessage) => "send_message",
            Self::Reminders(ReminderAction::ListLists) => "list_lists",
            Self::Reminders(ReminderAction::ListReminders) => "list_reminders",
            Self::Reminders(ReminderAction::CreateReminder) => "create_reminder",
            Self::Reminders(ReminderAction::CompleteReminder) => "complete_reminder",
        }
    }

    /// The stable wire name, e.g. `calendar_list_events`.
    pub fn name(self) -> String {
        format!("{}_{}", self.domain(), self.action())
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.domain(), self.action())
    }
}

impl FromStr for Tool {
    type Err = ToolNameError;

    /// Splits on the first `_` into domain and action.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (domain, action) = name.split_once('_').unwrap_or((name, ""));
        let domain = match domain {
            "calendar" => Domain::Calendar,
            "mail" => Domain::Mail,
            "reminders" => Domain::Reminders,
            other => {
                return Err(ToolNameError::UnknownDomain {
                    name: name.to_string(),
                    domain: other.to_string(),
                });
            }
        };

        Tool::ALL
            .into_iter()
            .find(|tool| tool.domain() == domain && tool.action() == action)
            .ok_or_else(|| ToolNameError::UnknownAction {
                domain: domain.to_string(),
                action: action.to_string(),
            })
    }
}
