//! The static tool catalogue served from `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::{CalendarAction, MailAction, ReminderAction, Tool};

/// One entry of the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the `arguments` object.
    pub input_schema: Value,
}

/// Parameter type in a tool schema.
#[derive(Debug, Clone, Copy)]
enum Kind {
    String,
    Integer,
    Boolean,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

struct Param {
    name: &'static str,
    kind: Kind,
    description: &'static str,
    required: bool,
}

const fn req(name: &'static str, description: &'static str) -> Param {
    Param {
        name,
        kind: Kind::String,
        description,
        required: true,
    }
}

const fn opt(name: &'static str, kind: Kind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        description,
        required: false,
    }
}

fn schema(params: &[Param]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(
            p.name.to_string(),
            json!({ "type": p.kind.as_str(), "description": p.description }),
        );
        if p.required {
            required.push(Value::String(p.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn describe(tool: Tool) -> (&'static str, Vec<Param>) {
    use Kind::*;

    match tool {
        Tool::Calendar(CalendarAction::ListCalendars) => ("List all calendars.", vec![]),
        Tool::Calendar(CalendarAction::ListEvents) => (
            "List calendar events in a date range. Defaults to the next 7 days if no dates are given.",
            vec![
                opt("from_date", String, "Start date/time (ISO-8601). Defaults to now."),
                opt("to_date", String, "End date/time (ISO-8601). Defaults to 7 days from now."),
                opt("calendar_uid", String, "Restrict results to this calendar UID."),
            ],
        ),
        Tool::Calendar(CalendarAction::GetEvent) => (
            "Get full details of a single calendar event by UID. Returns null when not found.",
            vec![req("event_uid", "The event UID.")],
        ),
        Tool::Calendar(CalendarAction::CreateEvent) => (
            "Create a new calendar event.",
            vec![
                req("title", "Event title."),
                req("start", "Start date/time (ISO-8601)."),
                req("end", "End date/time (ISO-8601)."),
                opt(
                    "calendar_uid",
                    String,
                    "Target calendar UID (uses the default calendar if omitted).",
                ),
                opt("location", String, "Optional location."),
                opt("description", String, "Optional notes."),
            ],
        ),
        Tool::Mail(MailAction::ListMailboxes) => ("List all mailboxes (folders).", vec![]),
        Tool::Mail(MailAction::ListMessages) => (
            "List messages in a mailbox, newest first (default: INBOX).",
            vec![
                opt("mailbox", String, "Mailbox name (default: INBOX)."),
                opt("limit", Integer, "Max messages to return (default 20, max 100)."),
                opt("unread_only", Boolean, "Return only unread messages."),
            ],
        ),
        Tool::Mail(MailAction::GetMessage) => (
            "Get the full content of an email by UID. Returns null when not found.",
            vec![
                req("uid", "Message UID, as returned by mail_list_messages."),
                opt(
                    "mailbox",
                    String,
                    "Mailbox containing the message (default: INBOX).",
                ),
            ],
        ),
        Tool::Mail(MailAction::SendMessage) => (
            "Send a plain-text email from the configured account.",
            vec![
                req("to", "Recipient address (or comma-separated list)."),
                req("subject", "Email subject."),
                req("body", "Plain-text body."),
                opt("cc", String, "Optional CC addresses (comma-separated)."),
                opt("bcc", String, "Optional BCC addresses (comma-separated)."),
            ],
        ),
        Tool::Reminders(ReminderAction::ListLists) => ("List all reminder lists.", vec![]),
        Tool::Reminders(ReminderAction::ListReminders) => (
            "List reminders across all lists, optionally filtered by list.",
            vec![
                opt("list_uid", String, "Restrict to a specific reminder list UID."),
                opt(
                    "include_completed",
                    Boolean,
                    "Include completed reminders (default: false).",
                ),
            ],
        ),
        Tool::Reminders(ReminderAction::CreateReminder) => (
            "Create a new reminder.",
            vec![
                req("title", "Reminder title."),
                opt(
                    "list_uid",
                    String,
                    "Target list UID (uses the default list if omitted).",
                ),
                opt("due", String, "Optional due date/time (ISO-8601)."),
                opt("description", String, "Optional notes."),
                opt("priority", Integer, "Priority: 0=none, 1=high, 5=medium, 9=low."),
            ],
        ),
        Tool::Reminders(ReminderAction::CompleteReminder) => (
            "Mark a reminder as completed. Returns {completed: false} when the UID is unknown.",
            vec![req("uid", "The reminder UID.")],
        ),
    }
}

/// Returns the descriptor for one tool.
pub fn descriptor(tool: Tool) -> ToolDescriptor {
    let (description, params) = describe(tool);
    ToolDescriptor {
        name: tool.name(),
        description: description.to_string(),
        input_schema: schema(&params),
    }
}

/// Returns every tool descriptor, in a stable order.
pub fn tools() -> Vec<ToolDescriptor> {
    Tool::ALL.into_iter().map(descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_stable_names() {
        let names: Vec<String> = tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "calendar_list_calendars",
                "calendar_list_events",
                "calendar_get_event",
                "calendar_create_event",
                "mail_list_mailboxes",
                "mail_list_messages",
                "mail_get_message",
                "mail_send_message",
                "reminders_list_lists",
                "reminders_list_reminders",
                "reminders_create_reminder",
                "reminders_complete_reminder",
            ]
        );
    }

    #[test]
    fn required_lists() {
        let create = descriptor(Tool::Calendar(CalendarAction::CreateEvent));
        assert_eq!(
            create.input_schema["required"],
            json!(["title", "start", "end"])
        );
        assert_eq!(
            create.input_schema["properties"]["calendar_uid"]["type"],
            "string"
        );

        let list = descriptor(Tool::Mail(MailAction::ListMessages));
        assert_eq!(list.input_schema["required"], json!([]));
        assert_eq!(list.input_schema["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn serializes_input_schema_camel_case() {
        let json = serde_json::to_value(descriptor(Tool::Reminders(ReminderAction::ListLists)))
            .unwrap();
        assert!(json.get("inputSchema").is_some());
        assert_eq!(json["inputSchema"]["type"], "object");
    }
}
