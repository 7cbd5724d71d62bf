//! CalDAV implementation of [`CalendarAdapter`] and its connector.

use std::sync::Arc;

use cloudgate_core::TimeWindow;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapter::{BoxFuture, CalendarAdapter, NewEvent};
use crate::connect::{AuthOutcome, CalendarHandle, Connector, Credentials};
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::raw::{RawCalendar, RawEvent, RawEventTime};

use super::client::CalDavClient;
use super::config::CalDavConfig;
use super::ics::{build_event_ics, parse_ics_content};
use super::xml::{
    DiscoveredCalendar, calendar_query_body, parse_calendars_response, parse_href_property,
    parse_report_response, propfind_calendars_body, propfind_default_calendar_body,
    propfind_home_body, propfind_principal_body,
};

const BACKEND: &str = "caldav";

/// Locations found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarHome {
    pub principal: String,
    pub home: String,
    /// Path of the account's default calendar, when the server names one.
    pub default_calendar: Option<String>,
}

/// An authenticated CalDAV account.
pub struct CalDavCalendar {
    client: Mutex<CalDavClient>,
    config: CalDavConfig,
    home: CalendarHome,
}

impl CalDavCalendar {
    /// Connects, authenticates and discovers the calendar home.
    pub async fn connect(config: CalDavConfig, credentials: Credentials) -> ProviderResult<Self> {
        let mut client = CalDavClient::new(&config, credentials)?;
        let home = discover_home(&mut client, &config).await?;
        info!(home = %home.home, "CalDAV account ready");
        Ok(Self {
            client: Mutex::new(client),
            config,
            home,
        })
    }

    async fn discover_calendars(&self) -> ProviderResult<Vec<DiscoveredCalendar>> {
        let url = self.config.resolve(&self.home.home);
        let body = propfind_calendars_body()?;
        debug!(url = %url, "Listing calendars via PROPFIND");

        let response = {
            let mut client = self.client.lock().await;
            client.propfind(&url, &body, 1).await?
        };
        let calendars = parse_calendars_response(&response);
        debug!(count = calendars.len(), "Discovered calendars");
        Ok(calendars)
    }

    async fn fetch_calendar_events(
        &self,
        calendar: &DiscoveredCalendar,
        window: TimeWindow,
    ) -> ProviderResult<Vec<RawEvent>> {
        let url = self.config.resolve(&calendar.href);
        let body = calendar_query_body(window.start, window.end)?;
        let response = {
            let mut client = self.client.lock().await;
            client.report(&url, &body).await?
        };

        let events: Vec<RawEvent> = parse_report_response(&response)
            .into_iter()
            .flat_map(|object| {
                parse_ics_content(&object.data, &calendar.href)
                    .into_iter()
                    .map(move |event| event.with_href(object.href.clone()))
            })
            .filter(|event| overlaps(event, &window))
            .collect();

        debug!(calendar = %calendar.href, count = events.len(), "Fetched events");
        Ok(events)
    }
}

fn overlaps(event: &RawEvent, window: &TimeWindow) -> bool {
    let instant = |t: RawEventTime| match t {
        RawEventTime::DateTime(dt) => dt,
        RawEventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
    };
    window.overlaps(instant(event.start), instant(event.end))
}

/// Full discovery: principal, then calendar home, then the default calendar.
async fn discover_home(
    client: &mut CalDavClient,
    config: &CalDavConfig,
) -> ProviderResult<CalendarHome> {
    let entry = config.url.to_string();
    let principal_xml = client
        .propfind(&entry, &propfind_principal_body()?, 0)
        .await?;
    let principal = parse_href_property(&principal_xml, "current-user-principal")
        .unwrap_or_else(|| config.url.path().to_string());

    let home_xml = client
        .propfind(&config.resolve(&principal), &propfind_home_body()?, 0)
        .await?;
    let home = parse_href_property(&home_xml, "calendar-home-set").ok_or_else(|| {
        ProviderError::invalid_response("server did not report a calendar home")
    })?;

    let default_calendar = match parse_href_property(&home_xml, "schedule-inbox-URL") {
        Some(inbox) => {
            let result = client
                .propfind(
                    &config.resolve(&inbox),
                    &propfind_default_calendar_body()?,
                    0,
                )
                .await;
            match result {
                Ok(xml) => parse_href_property(&xml, "schedule-default-calendar-URL"),
                Err(e) if e.code().is_auth_failure() => return Err(e),
                Err(e) => {
                    debug!(error = %e, "No default calendar reported");
                    None
                }
            }
        }
        None => None,
    };

    Ok(CalendarHome {
        principal,
        home,
        default_calendar,
    })
}

/// Path portion of an href, with a trailing slash, for comparisons.
fn collection_path(href: &str) -> String {
    let path = url::Url::parse(href)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| href.to_string());
    if path.ends_with('/') {
        path
    } else {
        format!("{path}/")
    }
}

impl CalendarAdapter for CalDavCalendar {
    fn name(&self) -> &str {
        BACKEND
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<RawCalendar>>> {
        Box::pin(async move {
            let default = self.home.default_calendar.as_deref().map(collection_path);
            let calendars = self.discover_calendars().await?;
            Ok(calendars
                .into_iter()
                .map(|c| {
                    let is_default = default.as_deref() == Some(collection_path(&c.href).as_str());
                    RawCalendar {
                        id: c.href,
                        display_name: c.display_name,
                        color: c.color,
                        description: c.description,
                        is_default,
                    }
                })
                .collect())
        })
    }

    fn fetch_events(
        &self,
        window: TimeWindow,
        calendar_id: Option<String>,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let calendars: Vec<DiscoveredCalendar> = self
                .discover_calendars()
                .await?
                .into_iter()
                .filter(|c| calendar_id.as_ref().is_none_or(|id| *id == c.href))
                .collect();

            let mut events = Vec::new();
            let mut first_error: Option<ProviderError> = None;
            let mut succeeded = 0usize;

            for calendar in &calendars {
                match self.fetch_calendar_events(calendar, window).await {
                    Ok(found) => {
                        succeeded += 1;
                        events.extend(found);
                    }
                    Err(e) if e.code() == ProviderErrorCode::AuthenticationRejected => {
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(calendar = %calendar.href, error = %e, "Failed to fetch calendar");
                        first_error.get_or_insert(e);
                    }
                }
            }

            match first_error {
                Some(e) if succeeded == 0 => Err(e),
                _ => Ok(events),
            }
        })
    }

    fn create_event(
        &self,
        calendar_id: String,
        event: NewEvent,
    ) -> BoxFuture<'_, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let collection = self.config.resolve(&collection_path(&calendar_id));
            let url = format!("{}{}.ics", collection, event.uid);
            let ics = build_event_ics(&event);

            debug!(url = %url, "Creating event via PUT");
            {
                let mut client = self.client.lock().await;
                client.put_new(&url, &ics).await?;
            }

            let mut raw = RawEvent::new(
                event.uid.clone(),
                RawEventTime::DateTime(event.start),
                RawEventTime::DateTime(event.end),
                calendar_id,
            )
            .with_summary(event.title)
            .with_href(url);
            raw.location = event.location;
            raw.description = event.description;
            Ok(raw)
        })
    }
}

/// Authenticates CalDAV accounts. App-specific passwords never trigger a
/// verification challenge, so this connector only yields
/// [`AuthOutcome::Authenticated`].
pub struct CalDavConnector {
    config: CalDavConfig,
}

impl CalDavConnector {
    pub fn new(config: CalDavConfig) -> Self {
        Self { config }
    }
}

impl Connector for CalDavConnector {
    type Handle = CalendarHandle;

    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn connect(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, ProviderResult<AuthOutcome<Self::Handle>>> {
        Box::pin(async move {
            let calendar = CalDavCalendar::connect(self.config.clone(), credentials)
                .await
                .map_err(|e| e.or_provider(BACKEND))?;
            let handle: CalendarHandle = Arc::new(calendar);
            Ok(AuthOutcome::Authenticated(handle))
        })
    }
}
