//! WebDAV request bodies and multistatus parsing.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::{ProviderError, ProviderResult};

pub const DAV_NS: &str = "DAV:";
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";
pub const CS_NS: &str = "http://calendarserver.org/ns/";
pub const APPLE_NS: &str = "http://apple.com/ns/ical/";

/// A calendar collection found under the calendar home.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredCalendar {
    pub href: String,
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub ctag: Option<String>,
    /// Component names from `supported-calendar-component-set`. Empty when
    /// the server did not report the property.
    pub components: Vec<String>,
}

impl DiscoveredCalendar {
    /// True when the collection can hold events.
    pub fn holds_events(&self) -> bool {
        self.components.is_empty()
            || self
                .components
                .iter()
                .any(|c| c.eq_ignore_ascii_case("VEVENT"))
    }
}

/// One calendar object returned by a REPORT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    pub href: String,
    pub etag: Option<String>,
    pub data: String,
}

/// Collects writer events and remembers the first failure.
struct XmlBody {
    writer: Writer<Cursor<Vec<u8>>>,
    failure: Option<String>,
}

impl XmlBody {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
            failure: None,
        }
    }

    fn event(&mut self, event: Event<'_>) -> &mut Self {
        if self.failure.is_none()
            && let Err(e) = self.writer.write_event(event)
        {
            self.failure = Some(e.to_string());
        }
        self
    }

    fn root(&mut self, name: &str, namespaces: &[(&str, &str)]) -> &mut Self {
        let mut start = BytesStart::new(name);
        for ns in namespaces {
            start.push_attribute(*ns);
        }
        self.event(Event::Start(start))
    }

    fn open(&mut self, name: &str) -> &mut Self {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn close(&mut self, name: &str) -> &mut Self {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str) -> &mut Self {
        self.event(Event::Empty(BytesStart::new(name)))
    }

    fn empty_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.event(Event::Empty(start))
    }

    fn finish(self) -> ProviderResult<String> {
        if let Some(failure) = self.failure {
            return Err(ProviderError::internal(format!(
                "failed to build request body: {failure}"
            )));
        }
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| ProviderError::internal(format!("request body is not UTF-8: {e}")))
    }
}

/// PROPFIND body asking for `current-user-principal`.
pub fn propfind_principal_body() -> ProviderResult<String> {
    let mut body = XmlBody::new();
    body.root("d:propfind", &[("xmlns:d", DAV_NS)])
        .open("d:prop")
        .empty("d:current-user-principal")
        .close("d:prop")
        .close("d:propfind");
    body.finish()
}

/// PROPFIND body asking a principal for its calendar home and scheduling
/// inbox.
pub fn propfind_home_body() -> ProviderResult<String> {
    let mut body = XmlBody::new();
    body.root("d:propfind", &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS)])
        .open("d:prop")
        .empty("c:calendar-home-set")
        .empty("c:schedule-inbox-URL")
        .close("d:prop")
        .close("d:propfind");
    body.finish()
}

/// PROPFIND body asking a scheduling inbox for the default calendar.
pub fn propfind_default_calendar_body() -> ProviderResult<String> {
    let mut body = XmlBody::new();
    body.root("d:propfind", &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS)])
        .open("d:prop")
        .empty("c:schedule-default-calendar-URL")
        .close("d:prop")
        .close("d:propfind");
    body.finish()
}

/// PROPFIND body listing the calendars under a home collection.
pub fn propfind_calendars_body() -> ProviderResult<String> {
    let mut body = XmlBody::new();
    body.root(
        "d:propfind",
        &[
            ("xmlns:d", DAV_NS),
            ("xmlns:c", CALDAV_NS),
            ("xmlns:cs", CS_NS),
            ("xmlns:ic", APPLE_NS),
        ],
    )
    .open("d:prop")
    .empty("d:displayname")
    .empty("d:resourcetype")
    .empty("c:calendar-description")
    .empty("c:supported-calendar-component-set")
    .empty("cs:getctag")
    .empty("ic:calendar-color")
    .close("d:prop")
    .close("d:propfind");
    body.finish()
}

/// `calendar-query` REPORT body for VEVENTs overlapping `[start, end)`,
/// with recurring events expanded into instances.
pub fn calendar_query_body(start: DateTime<Utc>, end: DateTime<Utc>) -> ProviderResult<String> {
    let start = format_icalendar_datetime(start);
    let end = format_icalendar_datetime(end);
    let range = [("start", start.as_str()), ("end", end.as_str())];

    let mut body = XmlBody::new();
    body.root(
        "c:calendar-query",
        &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS)],
    )
    .open("d:prop")
    .empty("d:getetag")
    .open("c:calendar-data")
    .empty_with("c:expand", &range)
    .close("c:calendar-data")
    .close("d:prop")
    .open("c:filter");

    let mut vcalendar = BytesStart::new("c:comp-filter");
    vcalendar.push_attribute(("name", "VCALENDAR"));
    let mut vevent = BytesStart::new("c:comp-filter");
    vevent.push_attribute(("name", "VEVENT"));

    body.event(Event::Start(vcalendar))
        .event(Event::Start(vevent))
        .empty_with("c:time-range", &range)
        .close("c:comp-filter")
        .close("c:comp-filter")
        .close("c:filter")
        .close("c:calendar-query");
    body.finish()
}

/// Returns the first `<href>` nested inside the element named `property`.
pub fn parse_href_property(xml: &str, property: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside_property = false;
    let mut inside_href = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    local if local.eq_ignore_ascii_case(property) => inside_property = true,
                    "href" if inside_property => inside_href = true,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    local if local.eq_ignore_ascii_case(property) => inside_property = false,
                    "href" => inside_href = false,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) if inside_href => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Parses the calendar listing PROPFIND response.
///
/// Non-calendar collections (the home itself, inboxes) are skipped, as are
/// calendars that only hold tasks.
pub fn parse_calendars_response(xml: &str) -> Vec<DiscoveredCalendar> {
    let mut calendars = Vec::new();

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current = DiscoveredCalendar::default();
    let mut is_calendar = false;
    let mut in_response = false;
    let mut in_propstat_href = false;
    let mut in_component_set = false;
    let mut current_element: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                match local_name(&name) {
                    "response" => {
                        in_response = true;
                        current = DiscoveredCalendar::default();
                        is_calendar = false;
                        in_component_set = false;
                    }
                    "href" if in_response && current.href.is_empty() => in_propstat_href = true,
                    "calendar" => is_calendar = true,
                    "supported-calendar-component-set" => in_component_set = true,
                    "comp" if in_component_set => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"name" {
                                current
                                    .components
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    local @ ("displayname" | "calendar-description" | "getctag"
                    | "calendar-color") => {
                        current_element = Some(local.to_string());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "response" if in_response => {
                        if is_calendar && !current.href.is_empty() && current.holds_events() {
                            calendars.push(std::mem::take(&mut current));
                        }
                        in_response = false;
                    }
                    "supported-calendar-component-set" => in_component_set = false,
                    "href" => in_propstat_href = false,
                    _ => {}
                }
                current_element = None;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_propstat_href {
                    current.href = text;
                } else if let Some(ref elem) = current_element {
                    match elem.as_str() {
                        "displayname" => current.display_name = Some(text),
                        "calendar-description" => current.description = Some(text),
                        "getctag" => current.ctag = Some(text),
                        "calendar-color" => current.color = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    calendars
}

/// Parses a calendar-query REPORT response.
pub fn parse_report_response(xml: &str) -> Vec<CalendarObject> {
    let mut results = Vec::new();

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut href: Option<String> = None;
    let mut etag: Option<String> = None;
    let mut data: Option<String> = None;
    let mut in_response = false;
    let mut current_element: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "response" => {
                        in_response = true;
                        href = None;
                        etag = None;
                        data = None;
                    }
                    local @ ("href" | "getetag" | "calendar-data") => {
                        current_element = Some(local.to_string());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if local_name(&name) == "response" && in_response {
                    if let (Some(h), Some(d)) = (href.take(), data.take()) {
                        results.push(CalendarObject {
                            href: h,
                            etag: etag.take(),
                            data: d,
                        });
                    }
                    in_response = false;
                }
                current_element = None;
            }
            Ok(Event::Text(e)) => {
                if let Some(ref elem) = current_element {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match elem.as_str() {
                        "href" => href = Some(text),
                        "getetag" => etag = Some(text.trim_matches('"').to_string()),
                        "calendar-data" => data = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref elem) = current_element {
                    let text = String::from_utf8_lossy(&e).to_string();
                    match elem.as_str() {
                        "href" => href = Some(text),
                        "getetag" => etag = Some(text.trim_matches('"').to_string()),
                        "calendar-data" => data = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    results
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn format_icalendar_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
