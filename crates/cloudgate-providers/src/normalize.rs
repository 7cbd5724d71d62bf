//! Raw record to uniform entity mapping.
//!
//! One pure function per entity. Every optional backend field has a fixed
//! default here so the output schema never depends on which backend produced
//! the record:
//!
//! | field | default |
//! |---|---|
//! | event / reminder title | `(no title)` |
//! | message subject | `(no subject)` |
//! | location, description, from, to | empty string |
//! | calendar title | the calendar id |
//! | reminder completed | `false` |
//! | reminder priority | `0` |

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use cloudgate_core::{
    Calendar, Event, Mailbox, Message, MessageSummary, Reminder, ReminderList, ReminderPriority,
};
use mailparse::{DispositionType, MailHeader, MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

use crate::raw::{
    NativeReminder, NativeReminderList, RawCalendar, RawEvent, RawEventTime, RawMailbox,
    RawMessage,
};

pub const NO_TITLE: &str = "(no title)";
pub const NO_SUBJECT: &str = "(no subject)";

/// Converts a [`RawEvent`] to an [`Event`].
pub fn normalize_event(raw: &RawEvent) -> Event {
    Event {
        uid: raw.id.clone(),
        title: non_blank(raw.summary.as_deref()).unwrap_or(NO_TITLE).to_string(),
        start: instant(&raw.start),
        end: instant(&raw.end),
        location: raw.location.clone().unwrap_or_default(),
        description: raw.description.clone().unwrap_or_default(),
        calendar_id: raw.calendar_id.clone(),
    }
}

/// Normalizes many events, dropping cancelled ones.
pub fn normalize_events(events: &[RawEvent]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| !e.is_cancelled())
        .map(normalize_event)
        .collect()
}

/// All-day dates become midnight UTC.
fn instant(time: &RawEventTime) -> DateTime<Utc> {
    match time {
        RawEventTime::DateTime(dt) => *dt,
        RawEventTime::Date(date) => midnight_utc(*date),
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

pub fn normalize_calendar(raw: &RawCalendar) -> Calendar {
    Calendar {
        uid: raw.id.clone(),
        title: non_blank(raw.display_name.as_deref())
            .unwrap_or(&raw.id)
            .to_string(),
        color: raw.color.as_deref().and_then(normalize_color),
    }
}

/// Apple servers report `#RRGGBBAA`; the alpha channel is dropped.
fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim();
    if color.is_empty() {
        return None;
    }
    if color.starts_with('#')
        && color.len() == 9
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
    {
        return Some(color[..7].to_string());
    }
    Some(color.to_string())
}

pub fn normalize_mailbox(raw: &RawMailbox) -> Mailbox {
    Mailbox {
        name: raw.name.clone(),
        unread: raw.unseen,
        total: raw.messages,
    }
}

/// Builds a summary from a message's header block (or whole message).
///
/// Unparsable headers yield a summary with default fields rather than an
/// error.
pub fn normalize_summary(raw: &RawMessage) -> MessageSummary {
    match mailparse::parse_headers(&raw.content) {
        Ok((headers, _)) => summary_from_headers(raw, &headers),
        Err(e) => {
            warn!(uid = raw.uid, error = %e, "Unparsable message headers");
            summary_from_headers(raw, &[])
        }
    }
}

fn summary_from_headers(raw: &RawMessage, headers: &[MailHeader<'_>]) -> MessageSummary {
    let has_attachments = headers
        .get_first_value("Content-Type")
        .map(|ct| mailparse::parse_content_type(&ct).mimetype)
        .is_some_and(|mime| mime.eq_ignore_ascii_case("multipart/mixed"));

    MessageSummary {
        uid: raw.uid.to_string(),
        subject: header_or(headers, "Subject", NO_SUBJECT),
        from: header_or(headers, "From", ""),
        to: header_or(headers, "To", ""),
        date: headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        read: raw.flags.seen,
        flagged: raw.flags.flagged,
        has_attachments,
    }
}

fn header_or(headers: &[MailHeader<'_>], name: &str, default: &str) -> String {
    headers
        .get_first_value(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Builds a full message with a decoded body.
pub fn normalize_message(raw: &RawMessage) -> Message {
    let summary = normalize_summary(raw);
    let body = match mailparse::parse_mail(&raw.content) {
        Ok(parsed) => extract_body(&parsed),
        Err(e) => {
            warn!(uid = raw.uid, error = %e, "Unparsable message, returning raw text");
            String::from_utf8_lossy(&raw.content).into_owned()
        }
    };
    Message { summary, body }
}

/// Picks the body text.
///
/// The first `text/plain` part not marked as an attachment wins, searching
/// depth first. Otherwise the top-level payload is decoded on its own.
pub fn extract_body(mail: &ParsedMail<'_>) -> String {
    if !mail.subparts.is_empty() {
        if let Some(part) = first_plain_part(mail) {
            return decode_part(part);
        }
        debug!("No plain-text part, falling back to top-level payload");
    }
    decode_part(mail)
}

fn first_plain_part<'a, 'b>(mail: &'a ParsedMail<'b>) -> Option<&'a ParsedMail<'b>> {
    for part in &mail.subparts {
        if !part.subparts.is_empty() {
            if let Some(found) = first_plain_part(part) {
                return Some(found);
            }
            continue;
        }
        let is_attachment =
            part.get_content_disposition().disposition == DispositionType::Attachment;
        if !is_attachment && part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            return Some(part);
        }
    }
    None
}

/// Decodes with the declared charset, falling back to lossy UTF-8.
fn decode_part(part: &ParsedMail<'_>) -> String {
    match part.get_body() {
        Ok(text) => text,
        Err(e) => {
            debug!(charset = %part.ctype.charset, error = %e, "Charset decode failed");
            part.get_body_raw()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default()
        }
    }
}

pub fn normalize_reminder(raw: &NativeReminder) -> Reminder {
    Reminder {
        uid: raw.identifier.clone().unwrap_or_default(),
        title: non_blank(raw.title.as_deref()).unwrap_or(NO_TITLE).to_string(),
        description: raw.notes.clone().unwrap_or_default(),
        completed: raw.is_completed(),
        due: raw.due_date,
        priority: ReminderPriority::from_raw(raw.priority.unwrap_or(0)),
        list_id: raw.list_identifier.clone().unwrap_or_default(),
    }
}

pub fn normalize_reminder_list(raw: &NativeReminderList) -> ReminderList {
    let uid = raw.identifier.clone().unwrap_or_default();
    ReminderList {
        title: non_blank(raw.title.as_deref()).unwrap_or(&uid).to_string(),
        uid,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawMessageFlags;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn message(uid: u32, content: &str) -> RawMessage {
        RawMessage {
            uid,
            flags: RawMessageFlags::default(),
            content: content.as_bytes().to_vec(),
        }
    }

    mod events {
        use super::*;

        #[test]
        fn defaults_for_missing_fields() {
            let raw = RawEvent::new(
                "e1",
                RawEventTime::DateTime(utc(2025, 2, 5, 9)),
                RawEventTime::DateTime(utc(2025, 2, 5, 10)),
                "work",
            );
            let event = normalize_event(&raw);
            assert_eq!(event.title, NO_TITLE);
            assert_eq!(event.location, "");
            assert_eq!(event.description, "");
            assert_eq!(event.calendar_id, "work");
            assert_eq!(event.start, utc(2025, 2, 5, 9));
        }

        #[test]
        fn all_day_becomes_midnight_utc() {
            let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
            let raw = RawEvent::new(
                "holiday",
                RawEventTime::Date(date),
                RawEventTime::Date(date.succ_opt().unwrap()),
                "cal",
            )
            .with_summary("Holiday");
            let event = normalize_event(&raw);
            assert_eq!(event.start, utc(2025, 2, 10, 0));
            assert_eq!(event.end, utc(2025, 2, 11, 0));
        }

        #[test]
        fn end_before_start_passes_through() {
            let raw = RawEvent::new(
                "odd",
                RawEventTime::DateTime(utc(2025, 2, 5, 12)),
                RawEventTime::DateTime(utc(2025, 2, 5, 11)),
                "cal",
            );
            let event = normalize_event(&raw);
            assert!(event.end < event.start);
        }

        #[test]
        fn cancelled_are_dropped() {
            let time = RawEventTime::DateTime(utc(2025, 2, 5, 9));
            let events = vec![
                RawEvent::new("a", time, time, "c"),
                RawEvent::new("b", time, time, "c").with_status("CANCELLED"),
            ];
            let normalized = normalize_events(&events);
            assert_eq!(normalized.len(), 1);
            assert_eq!(normalized[0].uid, "a");
        }
    }

    mod calendars {
        use super::*;

        #[test]
        fn title_falls_back_to_id() {
            let cal = normalize_calendar(&RawCalendar::new("/cal/home/"));
            assert_eq!(cal.title, "/cal/home/");
            assert!(cal.color.is_none());
        }

        #[test]
        fn alpha_channel_is_dropped() {
            let raw = RawCalendar::new("x")
                .with_display_name("Work")
                .with_color("#FF2968FF");
            assert_eq!(normalize_calendar(&raw).color.as_deref(), Some("#FF2968"));

            let raw = RawCalendar::new("x").with_color("#1BADF8");
            assert_eq!(normalize_calendar(&raw).color.as_deref(), Some("#1BADF8"));
        }
    }

    mod mail {
        use super::*;

        const PLAIN: &str = "From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n\
Date: Wed, 05 Feb 2025 10:00:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello Bob\r\n";

        const MULTIPART: &str = "From: a@example.com\r\n\
To: b@example.com\r\n\
Subject: Report\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=us-ascii\r\n\
Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
\r\n\
attached notes\r\n\
--XYZ\r\n\
Content-Type: multipart/alternative; boundary=\"ALT\"\r\n\
\r\n\
--ALT\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html body</p>\r\n\
--ALT\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain body\r\n\
--ALT--\r\n\
--XYZ--\r\n";

        const HTML_ONLY: &str = "Subject: promo\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<b>Sale</b>\r\n";

        #[test]
        fn summary_decodes_headers() {
            let mut raw = message(7, PLAIN);
            raw.flags = RawMessageFlags {
                seen: true,
                flagged: false,
            };
            let summary = normalize_summary(&raw);
            assert_eq!(summary.uid, "7");
            assert_eq!(summary.subject, "Café");
            assert_eq!(summary.from, "Alice <alice@example.com>");
            assert_eq!(summary.to, "bob@example.com");
            assert_eq!(summary.date, Some(utc(2025, 2, 5, 10)));
            assert!(summary.read);
            assert!(!summary.has_attachments);
        }

        #[test]
        fn missing_subject_gets_default() {
            let summary = normalize_summary(&message(1, "From: a@example.com\r\n\r\n"));
            assert_eq!(summary.subject, NO_SUBJECT);
            assert!(summary.date.is_none());
        }

        #[test]
        fn multipart_mixed_has_attachments() {
            assert!(normalize_summary(&message(1, MULTIPART)).has_attachments);
        }

        #[test]
        fn body_skips_attachment_parts() {
            let msg = normalize_message(&message(1, MULTIPART));
            assert_eq!(msg.body.trim(), "plain body");
        }

        #[test]
        fn body_of_single_part() {
            let msg = normalize_message(&message(1, PLAIN));
            assert_eq!(msg.body.trim(), "Hello Bob");
        }

        #[test]
        fn body_falls_back_to_top_level_payload() {
            let msg = normalize_message(&message(1, HTML_ONLY));
            assert_eq!(msg.body.trim(), "<b>Sale</b>");
        }

        #[test]
        fn invalid_utf8_never_fails() {
            let mut content = b"Subject: bytes\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n".to_vec();
            content.extend_from_slice(&[0x66, 0x6f, 0xff, 0x6f]);
            let raw = RawMessage {
                uid: 3,
                flags: RawMessageFlags::default(),
                content,
            };
            let msg = normalize_message(&raw);
            assert!(msg.body.starts_with("fo"));
        }

        #[test]
        fn mailbox_counts_pass_through() {
            let mb = normalize_mailbox(&RawMailbox {
                name: "INBOX".into(),
                unseen: Some(3),
                messages: None,
            });
            assert_eq!(mb.unread, Some(3));
            assert!(mb.total.is_none());
        }
    }

    mod reminders {
        use super::*;

        #[test]
        fn defaults_for_empty_record() {
            let reminder = normalize_reminder(&NativeReminder::default());
            assert_eq!(reminder.uid, "");
            assert_eq!(reminder.title, NO_TITLE);
            assert!(!reminder.completed);
            assert_eq!(reminder.priority, ReminderPriority::None);
            assert!(reminder.due.is_none());
        }

        #[test]
        fn fields_map_through() {
            let raw = NativeReminder {
                identifier: Some("r1".into()),
                title: Some("Pay rent".into()),
                notes: Some("before the 5th".into()),
                completed: Some(true),
                due_date: Some(utc(2025, 3, 1, 9)),
                priority: Some(3),
                list_identifier: Some("home".into()),
                ..Default::default()
            };
            let reminder = normalize_reminder(&raw);
            assert_eq!(reminder.uid, "r1");
            assert_eq!(reminder.description, "before the 5th");
            assert!(reminder.completed);
            assert_eq!(reminder.priority, ReminderPriority::High);
            assert_eq!(reminder.list_id, "home");
        }

        #[test]
        fn list_title_falls_back_to_id() {
            let list = normalize_reminder_list(&NativeReminderList {
                identifier: Some("abc".into()),
                title: None,
            });
            assert_eq!(list.title, "abc");
        }
    }
}
