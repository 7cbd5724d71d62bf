//! `reminders_*` tools.

use cloudgate_core::{CompletionResult, ReminderPriority};
use cloudgate_protocol::{ArgumentError, Arguments, ReminderAction};
use cloudgate_providers::normalize::{normalize_reminder, normalize_reminder_list};
use cloudgate_providers::{
    NewReminder, ProviderError, ProviderResult, ReminderAdapter, ReminderPredicate,
};
use serde_json::Value;

use super::{invalid, optional_instant, optional_str, payload, required_str};

pub(crate) async fn handle(
    action: ReminderAction,
    reminders: &dyn ReminderAdapter,
    args: &Arguments,
) -> ProviderResult<Value> {
    match action {
        ReminderAction::ListLists => {
            let lists = reminders.list_lists().await?;
            payload(&lists.iter().map(normalize_reminder_list).collect::<Vec<_>>())
        }
        ReminderAction::ListReminders => {
            let predicate = ReminderPredicate {
                lists: optional_str(args, "list_uid")?.map(|id| vec![id.to_string()]),
                include_completed: args.bool_or("include_completed", false).map_err(invalid)?,
            };
            let found = reminders.fetch_reminders(predicate).await?;
            payload(&found.iter().map(normalize_reminder).collect::<Vec<_>>())
        }
        ReminderAction::CreateReminder => {
            let reminder = new_reminder(reminders, args).await?;
            let created = reminders.create_reminder(reminder).await?;
            payload(&normalize_reminder(&created))
        }
        ReminderAction::CompleteReminder => {
            let uid = required_str(args, "uid")?.to_string();
            let completed = reminders.complete_reminder(uid).await?;
            payload(&CompletionResult { completed })
        }
    }
}

async fn new_reminder(
    reminders: &dyn ReminderAdapter,
    args: &Arguments,
) -> ProviderResult<NewReminder> {
    let title = required_str(args, "title")?.to_string();
    let due = optional_instant(args, "due")?;
    let notes = optional_str(args, "description")?.map(str::to_string);
    let priority = ReminderPriority::from_raw(args.int_or("priority", 0).map_err(invalid)?);
    let list_id = target_list(reminders, optional_str(args, "list_uid")?).await?;

    Ok(NewReminder {
        title,
        list_id,
        due,
        notes,
        priority: priority.as_raw(),
    })
}

/// The named list if it exists, else the store default, else the first list.
async fn target_list(
    reminders: &dyn ReminderAdapter,
    requested: Option<&str>,
) -> ProviderResult<String> {
    let lists = reminders.list_lists().await?;
    if let Some(id) = requested {
        return lists
            .iter()
            .find_map(|l| l.identifier.as_deref().filter(|lid| *lid == id))
            .map(str::to_string)
            .ok_or_else(|| {
                invalid(ArgumentError::new(
                    "list_uid",
                    format!("no reminder list with id '{id}'"),
                ))
            });
    }
    if let Some(id) = reminders.default_list().await?.and_then(|l| l.identifier) {
        return Ok(id);
    }
    lists
        .into_iter()
        .find_map(|l| l.identifier)
        .ok_or_else(|| ProviderError::not_found("the reminder store has no list"))
}
