//! iCalendar (RFC 5545) reading and writing.

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::{debug, warn};

use crate::adapter::NewEvent;
use crate::raw::{RawEvent, RawEventTime};

/// Extracts the VEVENTs of one calendar object.
///
/// Unparseable content yields no events rather than an error so that one
/// malformed object does not hide the rest of a calendar.
pub fn parse_ics_content(ics: &str, calendar_id: &str) -> Vec<RawEvent> {
    let calendar = match ics.parse::<Calendar>() {
        Ok(cal) => cal,
        Err(e) => {
            warn!(error = %e, "Failed to parse ICS content");
            return Vec::new();
        }
    };

    calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event, calendar_id),
            _ => None,
        })
        .collect()
}

fn parse_event(event: &Event, calendar_id: &str) -> Option<RawEvent> {
    let uid = event.get_uid()?;
    let start = convert_date_time(event.get_start()?);
    let end = match event.get_end() {
        Some(end) => convert_date_time(end),
        None => implied_end(start, event.property_value("DURATION")),
    };

    let mut raw = RawEvent::new(uid, start, end, calendar_id);
    if let Some(summary) = event.get_summary() {
        raw = raw.with_summary(summary);
    }
    if let Some(description) = event.get_description() {
        raw = raw.with_description(description);
    }
    if let Some(location) = event.get_location() {
        raw = raw.with_location(location);
    }
    if let Some(status) = event.get_status() {
        raw = raw.with_status(format!("{:?}", status));
    }

    debug!(uid = %raw.id, start = ?raw.start, "Parsed event from ICS");
    Some(raw)
}

/// End of an event without DTEND: start plus DURATION when present, else
/// one day for dates and zero length for instants.
///
/// A duration that cannot be added to the start falls back to the same
/// default as a missing one.
fn implied_end(start: RawEventTime, duration: Option<&str>) -> RawEventTime {
    let duration = duration.and_then(parse_duration);
    match start {
        RawEventTime::DateTime(dt) => RawEventTime::DateTime(
            duration
                .and_then(|d| dt.checked_add_signed(d))
                .unwrap_or(dt),
        ),
        RawEventTime::Date(date) => {
            let days = duration.map(|d| d.num_days().max(1)).unwrap_or(1);
            let end = Duration::try_days(days)
                .and_then(|d| date.checked_add_signed(d))
                .or_else(|| date.succ_opt())
                .unwrap_or(date);
            RawEventTime::Date(end)
        }
    }
}

/// Parses an RFC 5545 DURATION value such as `PT1H30M`, `P1D` or `-P2W`.
///
/// Values outside the representable range yield `None`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, rest) = match value.as_bytes().first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut in_time = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' => in_time = true,
            unit => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                let part = match (unit, in_time) {
                    ('W', false) => Duration::try_weeks(n),
                    ('D', false) => Duration::try_days(n),
                    ('H', true) => Duration::try_hours(n),
                    ('M', true) => Duration::try_minutes(n),
                    ('S', true) => Duration::try_seconds(n),
                    _ => return None,
                };
                total = total.checked_add(&part?)?;
            }
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn convert_date_time(dt: DatePerhapsTime) -> RawEventTime {
    match dt {
        DatePerhapsTime::Date(date) => RawEventTime::Date(date),
        DatePerhapsTime::DateTime(cdt) => RawEventTime::DateTime(match cdt {
            CalendarDateTime::Utc(dt) => dt,
            // Floating times carry no zone; treated as UTC.
            CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                resolve_in_zone(&date_time, &tzid)
            }
        }),
    }
}

/// Resolves a zoned local time, falling back to UTC for unknown zones.
fn resolve_in_zone(local: &NaiveDateTime, tzid: &str) -> chrono::DateTime<Utc> {
    match lookup_zone(tzid) {
        Some(tz) => match tz.from_local_datetime(local).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            // Inside a DST gap: take the wall time one hour later.
            None => tz
                .from_local_datetime(&(*local + Duration::hours(1)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(local)),
        },
        None => {
            warn!(tzid = %tzid, "Unknown TZID, treating time as UTC");
            Utc.from_utc_datetime(local)
        }
    }
}

/// Finds an IANA zone for a TZID, including vendor-prefixed forms like
/// `/mozilla.org/20050126_1/Europe/Paris`.
fn lookup_zone(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim().trim_matches('"');
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }
    let segments: Vec<&str> = tzid.split('/').filter(|s| !s.is_empty()).collect();
    (1..segments.len())
        .rev()
        .find_map(|n| segments[segments.len() - n..].join("/").parse::<Tz>().ok())
}

/// Serializes a new event as a single-VEVENT VCALENDAR object.
pub fn build_event_ics(new: &NewEvent) -> String {
    let mut event = Event::new();
    event
        .uid(&new.uid)
        .summary(&new.title)
        .timestamp(Utc::now())
        .starts(new.start)
        .ends(new.end);
    if let Some(location) = &new.location {
        event.location(location);
    }
    if let Some(description) = &new.description {
        event.description(description);
    }

    let mut calendar = Calendar::new();
    calendar.push(event.done());
    calendar.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> RawEventTime {
        RawEventTime::DateTime(Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
    }

    #[test]
    fn parses_utc_event() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:e1@example.com\r\nDTSTART:20250205T100000Z\r\nDTEND:20250205T110000Z\r\nSUMMARY:Team Meeting\r\nLOCATION:Room 4\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "/cal/work/");
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.id, "e1@example.com");
        assert_eq!(e.calendar_id, "/cal/work/");
        assert_eq!(e.start, utc(2025, 2, 5, 10, 0));
        assert_eq!(e.end, utc(2025, 2, 5, 11, 0));
        assert_eq!(e.summary.as_deref(), Some("Team Meeting"));
        assert_eq!(e.location.as_deref(), Some("Room 4"));
    }

    #[test]
    fn resolves_tzid_with_dst() {
        // 10:00 in Paris during summer time is 08:00 UTC.
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:tz\r\nDTSTART;TZID=Europe/Paris:20250705T100000\r\nDTEND;TZID=Europe/Paris:20250705T110000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "c");
        assert_eq!(events[0].start, utc(2025, 7, 5, 8, 0));
        assert_eq!(events[0].end, utc(2025, 7, 5, 9, 0));
    }

    #[test]
    fn unknown_tzid_is_utc() {
        let local = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(
            resolve_in_zone(&local, "Nowhere Standard Time"),
            Utc.from_utc_datetime(&local)
        );
    }

    #[test]
    fn vendor_prefixed_tzid() {
        assert_eq!(
            lookup_zone("/mozilla.org/20050126_1/Europe/Paris"),
            Some(chrono_tz::Europe::Paris)
        );
        assert_eq!(lookup_zone("America/New_York"), Some(chrono_tz::America::New_York));
        assert_eq!(lookup_zone("garbage"), None);
    }

    #[test]
    fn all_day_without_end_spans_one_day() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:d\r\nDTSTART;VALUE=DATE:20250210\r\nSUMMARY:Holiday\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "c");
        assert_eq!(
            events[0].start,
            RawEventTime::Date(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap())
        );
        assert_eq!(
            events[0].end,
            RawEventTime::Date(NaiveDate::from_ymd_opt(2025, 2, 11).unwrap())
        );
    }

    #[test]
    fn duration_supplies_missing_end() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:dur\r\nDTSTART:20250205T100000Z\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "c");
        assert_eq!(events[0].end, utc(2025, 2, 5, 11, 30));
    }

    #[test]
    fn duration_grammar() {
        assert_eq!(parse_duration("PT15M"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("P1DT2H"), Some(Duration::hours(26)));
        assert_eq!(parse_duration("-P1W"), Some(-Duration::weeks(1)));
        assert_eq!(parse_duration("P1H"), None);
        assert_eq!(parse_duration("PT5"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("P99999999999999W"), None);
        assert_eq!(parse_duration("P99999999999999999999D"), None);
    }

    #[test]
    fn oversized_duration_does_not_drop_the_calendar() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n\
                   BEGIN:VEVENT\r\nUID:huge\r\nDTSTART:20250101T000000Z\r\nDURATION:P99999999999999W\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:edge\r\nDTSTART:20250101T000000Z\r\nDURATION:P30000000W\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:ok\r\nDTSTART:20250102T000000Z\r\nDURATION:PT1H\r\nEND:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "c");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].end, events[0].start);
        assert_eq!(events[1].end, events[1].start);
        assert_eq!(events[2].end, utc(2025, 1, 2, 1, 0));
    }

    #[test]
    fn cancelled_status_is_kept_for_filtering() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:x\r\nDTSTART:20250205T100000Z\r\nDTEND:20250205T110000Z\r\nSTATUS:CANCELLED\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "c");
        assert!(events[0].is_cancelled());
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_ics_content("not a calendar", "c").is_empty());
    }

    #[test]
    fn built_event_parses_back() {
        let new = NewEvent {
            uid: "abc-123".into(),
            title: "Planning".into(),
            start: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            location: Some("HQ".into()),
            description: None,
        };
        let ics = build_event_ics(&new);
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("UID:abc-123"));
        assert!(ics.contains("DTSTAMP:"));
        assert!(!ics.contains("DESCRIPTION"));

        let events = parse_ics_content(&ics, "c");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Planning"));
        assert_eq!(events[0].location.as_deref(), Some("HQ"));
        assert_eq!(events[0].start, utc(2025, 3, 1, 9, 0));
    }
}
