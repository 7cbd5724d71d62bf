//! Resource Gateway: tool name and arguments in, one envelope out.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use cloudgate_protocol::{Arguments, Envelope, Tool};
use cloudgate_providers::{ProviderError, ProviderResult, ReminderAdapter};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::handlers;
use crate::session::SessionRegistry;

/// Dispatches tool calls to adapters.
///
/// Calendar and mail tools go through their session first; reminder tools
/// use the local store directly.
pub struct Gateway {
    sessions: SessionRegistry,
    reminders: Arc<dyn ReminderAdapter>,
}

impl Gateway {
    pub fn new(sessions: SessionRegistry, reminders: Arc<dyn ReminderAdapter>) -> Self {
        Self {
            sessions,
            reminders,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Runs one tool call. Never fails: every error becomes `{error}`.
    pub async fn invoke(&self, name: &str, arguments: Arguments) -> Envelope {
        let tool: Tool = match name.parse() {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = name, error = %e, "Unknown tool");
                return Envelope::error(format!("unknown tool '{name}': {e}"));
            }
        };

        let started = Instant::now();
        debug!(tool = %tool, "Invoking tool");
        match self.dispatch(tool, &arguments).await {
            Ok(value) => {
                info!(
                    tool = %tool,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool succeeded"
                );
                Envelope::Success(value)
            }
            Err(error) => {
                warn!(
                    tool = %tool,
                    code = %error.code(),
                    provider = error.provider().unwrap_or("-"),
                    error = %error,
                    "Tool failed"
                );
                Envelope::error(error.envelope_message())
            }
        }
    }

    /// Same as [`Gateway::invoke`] with raw JSON arguments.
    pub async fn invoke_value(&self, name: &str, arguments: Value) -> Envelope {
        match Arguments::from_value(arguments) {
            Ok(arguments) => self.invoke(name, arguments).await,
            Err(e) => Envelope::error(ProviderError::input_invalid(e.to_string()).envelope_message()),
        }
    }

    async fn dispatch(&self, tool: Tool, args: &Arguments) -> ProviderResult<Value> {
        match tool {
            Tool::Calendar(action) => {
                let calendar = self.sessions.calendar().ensure().await?;
                handlers::calendar::handle(action, calendar.as_ref(), args, Utc::now()).await
            }
            Tool::Mail(action) => {
                let mail = self.sessions.mail().ensure().await?;
                handlers::mail::handle(action, mail.as_ref(), args).await
            }
            Tool::Reminders(action) => {
                handlers::reminders::handle(action, self.reminders.as_ref(), args).await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::challenge::NoPrompt;
    use crate::config::GatewayConfig;
    use crate::credentials::{CredentialProvider, StaticCredentials};
    use chrono::Duration;
    use cloudgate_providers::mock::{
        MockAuth, MockCalendar, MockConnector, MockMail, MockReminderStore,
    };
    use cloudgate_providers::reminders::NativeReminderAdapter;
    use cloudgate_providers::{
        CalendarHandle, Credentials, MailHandle, RawCalendar, RawEvent, RawEventTime,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct Fixture {
        pub gateway: Gateway,
        pub calendar_attempts: Arc<AtomicUsize>,
        pub mail_attempts: Arc<AtomicUsize>,
    }

    fn calendar() -> CalendarHandle {
        let now = Utc::now();
        Arc::new(
            MockCalendar::new()
                .with_calendar(RawCalendar::new("/cal/home/").with_default(true))
                .with_event(
                    RawEvent::new(
                        "standup",
                        RawEventTime::DateTime(now + Duration::hours(2)),
                        RawEventTime::DateTime(now + Duration::hours(3)),
                        "/cal/home/",
                    )
                    .with_summary("Standup"),
                )
                .with_event(RawEvent::new(
                    "next-month",
                    RawEventTime::DateTime(now + Duration::days(30)),
                    RawEventTime::DateTime(now + Duration::days(30) + Duration::hours(1)),
                    "/cal/home/",
                )),
        )
    }

    pub(crate) fn fixture_with(
        credentials: impl CredentialProvider + 'static,
        behavior: MockAuth,
    ) -> Fixture {
        let calendar = MockConnector::new(calendar(), behavior.clone())
            .with_delay(std::time::Duration::from_millis(20));
        let mail_handle: MailHandle = Arc::new(MockMail::new());
        let mail = MockConnector::new(mail_handle, behavior);
        let calendar_attempts = calendar.attempts();
        let mail_attempts = mail.attempts();

        let sessions = SessionRegistry::new(
            Arc::new(calendar),
            Arc::new(mail),
            Arc::new(credentials),
            Arc::new(NoPrompt),
            &GatewayConfig::default(),
        );
        let reminders = NativeReminderAdapter::new(Arc::new(MockReminderStore::new()));
        Fixture {
            gateway: Gateway::new(sessions, Arc::new(reminders)),
            calendar_attempts,
            mail_attempts,
        }
    }

    pub(crate) fn fixture() -> Fixture {
        fixture_with(
            StaticCredentials::new(Credentials::new("a@example.com", "s3cr3t")),
            MockAuth::Accept,
        )
    }

    #[tokio::test]
    async fn list_events_defaults_to_next_week() {
        let f = fixture();
        let env = f.gateway.invoke("calendar_list_events", Arguments::default()).await;
        let events = env.payload().unwrap().as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["uid"], "standup");
    }

    #[tokio::test]
    async fn create_then_get_round_trip() {
        let f = fixture();
        let start = (Utc::now() + Duration::days(1)).to_rfc3339();
        let end = (Utc::now() + Duration::days(1) + Duration::hours(1)).to_rfc3339();
        let created = f
            .gateway
            .invoke_value(
                "calendar_create_event",
                json!({"title": "Review", "start": start, "end": end}),
            )
            .await;
        let created = created.payload().unwrap().clone();

        let fetched = f
            .gateway
            .invoke_value("calendar_get_event", json!({"event_uid": created["uid"]}))
            .await;
        let fetched = fetched.payload().unwrap();
        assert_eq!(fetched["title"], "Review");
        assert_eq!(fetched["start"], created["start"]);
        assert_eq!(fetched["end"], created["end"]);
    }

    #[tokio::test]
    async fn missing_lookups_are_null() {
        let f = fixture();
        let env = f
            .gateway
            .invoke_value("calendar_get_event", json!({"event_uid": "nope"}))
            .await;
        assert_eq!(env.payload(), Some(&Value::Null));

        let env = f
            .gateway
            .invoke_value("mail_get_message", json!({"uid": 42}))
            .await;
        assert_eq!(env.payload(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn send_message_reports_receipt() {
        let f = fixture();
        let env = f
            .gateway
            .invoke_value(
                "mail_send_message",
                json!({"to": "x@y.com", "subject": "hi", "body": "test"}),
            )
            .await;
        let receipt = env.payload().unwrap();
        assert_eq!(receipt["status"], "sent");
        assert!(!receipt["message_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_missing_reminder_is_false() {
        let f = fixture();
        let env = f
            .gateway
            .invoke_value("reminders_complete_reminder", json!({"uid": "missing"}))
            .await;
        assert_eq!(env.to_value(), json!({"completed": false}));
    }

    #[tokio::test]
    async fn concurrent_first_calls_authenticate_once() {
        let f = fixture();
        let (a, b) = tokio::join!(
            f.gateway.invoke("calendar_list_calendars", Arguments::default()),
            f.gateway.invoke("calendar_list_events", Arguments::default()),
        );
        assert!(!a.is_error() && !b.is_error());
        assert_eq!(f.calendar_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_configured_differs_from_rejected() {
        let unconfigured = fixture_with(StaticCredentials::none(), MockAuth::Accept);
        let rejected = fixture_with(
            StaticCredentials::new(Credentials::new("a@example.com", "wrong")),
            MockAuth::Reject,
        );

        for tool in ["calendar_list_calendars", "mail_list_mailboxes"] {
            let a = unconfigured.gateway.invoke(tool, Arguments::default()).await;
            let b = rejected.gateway.invoke(tool, Arguments::default()).await;
            let a = a.error_message().unwrap();
            let b = b.error_message().unwrap();
            assert!(a.starts_with("not configured:"), "{a}");
            assert!(b.starts_with("authentication rejected:"), "{b}");
        }
        assert_eq!(unconfigured.calendar_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(unconfigured.mail_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reminders_skip_sessions() {
        let f = fixture_with(StaticCredentials::none(), MockAuth::Accept);
        let env = f.gateway.invoke("reminders_list_lists", Arguments::default()).await;
        assert!(!env.is_error());
        assert_eq!(f.calendar_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_are_envelopes() {
        let f = fixture();
        let env = f.gateway.invoke("contacts_list", Arguments::default()).await;
        assert!(env.error_message().unwrap().contains("contacts"));

        let env = f.gateway.invoke("mail_archive", Arguments::default()).await;
        assert!(env.is_error());

        let env = f.gateway.invoke_value("mail_list_messages", json!([1, 2])).await;
        assert!(env.error_message().unwrap().starts_with("invalid input:"));

        let env = f.gateway.invoke_value("calendar_get_event", json!({})).await;
        assert!(env.error_message().unwrap().contains("'event_uid'"));
    }

    #[tokio::test]
    async fn mail_limit_is_clamped() {
        let f = fixture();
        let env = f
            .gateway
            .invoke_value("mail_list_messages", json!({"limit": 250}))
            .await;
        assert!(env.payload().unwrap().as_array().unwrap().len() <= 100);
    }
}
