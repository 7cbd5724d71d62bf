//! `calendar_*` tools.

use chrono::{DateTime, Duration, Utc};
use cloudgate_core::{Event, TimeWindow};
use cloudgate_protocol::{ArgumentError, Arguments, CalendarAction};
use cloudgate_providers::normalize::{normalize_calendar, normalize_event, normalize_events};
use cloudgate_providers::{CalendarAdapter, NewEvent, ProviderError, ProviderResult};
use serde_json::Value;
use tracing::debug;

use super::{invalid, optional_instant, optional_str, payload, required_instant, required_str};

/// Default listing window length.
const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Half-widths of the windows searched for an event by uid, in order.
const LOOKUP_SPANS_DAYS: [i64; 2] = [90, 365];

pub(crate) async fn handle(
    action: CalendarAction,
    calendar: &dyn CalendarAdapter,
    args: &Arguments,
    now: DateTime<Utc>,
) -> ProviderResult<Value> {
    match action {
        CalendarAction::ListCalendars => {
            let calendars = calendar.list_calendars().await?;
            payload(&calendars.iter().map(normalize_calendar).collect::<Vec<_>>())
        }
        CalendarAction::ListEvents => payload(&list_events(calendar, args, now).await?),
        CalendarAction::GetEvent => {
            let uid = required_str(args, "event_uid")?;
            payload(&find_event(calendar, uid, now).await?)
        }
        CalendarAction::CreateEvent => payload(&create_event(calendar, args).await?),
    }
}

/// Resolves the listing window: `[now, now + 7 days)` by default, and seven
/// days from `from_date` when only that bound is given.
fn listing_window(args: &Arguments, now: DateTime<Utc>) -> ProviderResult<TimeWindow> {
    let from = optional_instant(args, "from_date")?;
    let to = optional_instant(args, "to_date")?;
    let start = from.unwrap_or(now);
    let end = match to {
        Some(end) => end,
        None => start
            .checked_add_signed(Duration::days(DEFAULT_WINDOW_DAYS))
            .ok_or_else(|| invalid(ArgumentError::new("from_date", "is out of range")))?,
    };
    TimeWindow::checked(start, end).ok_or_else(|| {
        invalid(ArgumentError::new(
            "to_date",
            "must not be earlier than the window start",
        ))
    })
}

async fn list_events(
    calendar: &dyn CalendarAdapter,
    args: &Arguments,
    now: DateTime<Utc>,
) -> ProviderResult<Vec<Event>> {
    let window = listing_window(args, now)?;
    let calendar_id = optional_str(args, "calendar_uid")?.map(str::to_string);

    let raw = calendar.fetch_events(window, calendar_id.clone()).await?;
    let mut events: Vec<Event> = normalize_events(&raw)
        .into_iter()
        .filter(|e| window.overlaps(e.start, e.end))
        .filter(|e| calendar_id.as_ref().is_none_or(|id| *id == e.calendar_id))
        .collect();
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.uid.cmp(&b.uid)));
    debug!(count = events.len(), start = %window.start, end = %window.end, "Listed events");
    Ok(events)
}

/// Searches progressively wider windows around `now`.
async fn find_event(
    calendar: &dyn CalendarAdapter,
    uid: &str,
    now: DateTime<Utc>,
) -> ProviderResult<Option<Event>> {
    for days in LOOKUP_SPANS_DAYS {
        let raw = calendar
            .fetch_events(TimeWindow::around(now, days), None)
            .await?;
        if let Some(found) = raw.iter().find(|e| e.id == uid && !e.is_cancelled()) {
            return Ok(Some(normalize_event(found)));
        }
        debug!(uid, days, "Event not in lookup window");
    }
    Ok(None)
}

/// Picks the named calendar, else the account default, else the first one.
async fn target_calendar(
    calendar: &dyn CalendarAdapter,
    requested: Option<&str>,
) -> ProviderResult<String> {
    let calendars = calendar.list_calendars().await?;
    if let Some(id) = requested {
        return calendars
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.id.clone())
            .ok_or_else(|| {
                invalid(ArgumentError::new(
                    "calendar_uid",
                    format!("no calendar with id '{id}'"),
                ))
            });
    }
    calendars
        .iter()
        .find(|c| c.is_default)
        .or_else(|| calendars.first())
        .map(|c| c.id.clone())
        .ok_or_else(|| ProviderError::not_found("the account has no calendar to create events in"))
}

async fn create_event(calendar: &dyn CalendarAdapter, args: &Arguments) -> ProviderResult<Event> {
    let title = required_str(args, "title")?.to_string();
    let start = required_instant(args, "start")?;
    let end = required_instant(args, "end")?;
    let location = optional_str(args, "location")?.map(str::to_string);
    let description = optional_str(args, "description")?.map(str::to_string);
    let calendar_id = target_calendar(calendar, optional_str(args, "calendar_uid")?).await?;

    let uid = uuid::Uuid::new_v4().to_string();
    let stored = calendar
        .create_event(
            calendar_id,
            NewEvent {
                uid: uid.clone(),
                title,
                start,
                end,
                location,
                description,
            },
        )
        .await?;

    let mut event = normalize_event(&stored);
    event.uid = uid;
    Ok(event)
}
