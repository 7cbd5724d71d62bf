//! Uniform reminder entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reminder priority on the 0/1/5/9 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReminderPriority {
    #[default]
    None,
    High,
    Medium,
    Low,
}

impl ReminderPriority {
    /// Maps an arbitrary integer onto the nearest bucket.
    ///
    /// 1 through 4 are high, 5 is medium, 6 through 9 are low and anything
    /// else is no priority.
    pub fn from_raw(value: i64) -> Self {
        match value {
            1..=4 => Self::High,
            5 => Self::Medium,
            6..=9 => Self::Low,
            _ => Self::None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Self::None => 0,
            Self::High => 1,
            Self::Medium => 5,
            Self::Low => 9,
        }
    }
}

impl Serialize for ReminderPriority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for ReminderPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

/// A reminder (task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub uid: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due: Option<DateTime<Utc>>,
    pub priority: ReminderPriority,
    /// Identifier of the list containing this reminder.
    #[serde(rename = "list")]
    pub list_id: String,
}

/// A reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderList {
    pub uid: String,
    pub title: String,
}

/// Outcome of completing a reminder by uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// False when no reminder with the uid exists.
    pub completed: bool,
}
