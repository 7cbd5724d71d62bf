//! In-memory adapters, connectors and stores for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cloudgate_core::TimeWindow;

use crate::adapter::{
    BoxFuture, CalendarAdapter, MailAdapter, MessageQuery, NewEvent, OutgoingMessage,
    ReminderPredicate,
};
use crate::connect::{AuthOutcome, Connector, Credentials, PendingChallenge};
use crate::error::{ProviderError, ProviderResult};
use crate::raw::{
    NativeReminder, NativeReminderList, RawCalendar, RawEvent, RawEventTime, RawMailbox,
    RawMessage, RawMessageFlags,
};
use crate::reminders::{AuthorizationStatus, Callback, NativeReminderStore, StoreResult};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A calendar account held in memory.
#[derive(Default)]
pub struct MockCalendar {
    calendars: Mutex<Vec<RawCalendar>>,
    events: Mutex<Vec<RawEvent>>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(self, calendar: RawCalendar) -> Self {
        lock(&self.calendars).push(calendar);
        self
    }

    pub fn with_event(self, event: RawEvent) -> Self {
        lock(&self.events).push(event);
        self
    }

    pub fn events(&self) -> Vec<RawEvent> {
        lock(&self.events).clone()
    }
}

fn event_span(event: &RawEvent) -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
    let instant = |t: RawEventTime| match t {
        RawEventTime::DateTime(dt) => dt,
        RawEventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
    };
    (instant(event.start), instant(event.end))
}

impl CalendarAdapter for MockCalendar {
    fn name(&self) -> &str {
        "mock-calendar"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<RawCalendar>>> {
        Box::pin(async move { Ok(lock(&self.calendars).clone()) })
    }

    fn fetch_events(
        &self,
        window: TimeWindow,
        calendar_id: Option<String>,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            Ok(lock(&self.events)
                .iter()
                .filter(|e| calendar_id.as_ref().is_none_or(|id| *id == e.calendar_id))
                .filter(|e| {
                    let (start, end) = event_span(e);
                    window.overlaps(start, end)
                })
                .cloned()
                .collect())
        })
    }

    fn create_event(
        &self,
        calendar_id: String,
        event: NewEvent,
    ) -> BoxFuture<'_, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let mut raw = RawEvent::new(
                event.uid,
                RawEventTime::DateTime(event.start),
                RawEventTime::DateTime(event.end),
                calendar_id,
            )
            .with_summary(event.title);
            raw.location = event.location;
            raw.description = event.description;
            lock(&self.events).push(raw.clone());
            Ok(raw)
        })
    }
}

/// A mailbox store held in memory. Messages are complete RFC 5322 bytes.
#[derive(Default)]
pub struct MockMail {
    mailboxes: Mutex<Vec<RawMailbox>>,
    messages: Mutex<Vec<(String, RawMessage)>>,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl MockMail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mailbox(self, mailbox: RawMailbox) -> Self {
        lock(&self.mailboxes).push(mailbox);
        self
    }

    pub fn with_message(
        self,
        mailbox: &str,
        uid: u32,
        seen: bool,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        lock(&self.messages).push((
            mailbox.to_string(),
            RawMessage {
                uid,
                flags: RawMessageFlags {
                    seen,
                    flagged: false,
                },
                content: content.into(),
            },
        ));
        self
    }

    /// Every message handed to `send_message`, in order.
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        lock(&self.sent).clone()
    }
}

impl MailAdapter for MockMail {
    fn name(&self) -> &str {
        "mock-mail"
    }

    fn list_mailboxes(&self) -> BoxFuture<'_, ProviderResult<Vec<RawMailbox>>> {
        Box::pin(async move { Ok(lock(&self.mailboxes).clone()) })
    }

    fn list_messages(&self, query: MessageQuery) -> BoxFuture<'_, ProviderResult<Vec<RawMessage>>> {
        Box::pin(async move {
            let mut found: Vec<RawMessage> = lock(&self.messages)
                .iter()
                .filter(|(mailbox, _)| *mailbox == query.mailbox)
                .map(|(_, message)| message)
                .filter(|m| !query.unread_only || !m.flags.seen)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.uid.cmp(&a.uid));
            found.truncate(query.limit);
            Ok(found)
        })
    }

    fn fetch_message(
        &self,
        mailbox: String,
        uid: u32,
    ) -> BoxFuture<'_, ProviderResult<Option<RawMessage>>> {
        Box::pin(async move {
            Ok(lock(&self.messages)
                .iter()
                .find(|(mb, m)| *mb == mailbox && m.uid == uid)
                .map(|(_, m)| m.clone()))
        })
    }

    fn send_message(&self, message: OutgoingMessage) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            lock(&self.sent).push(message);
            Ok(format!("<{}@mock.local>", uuid::Uuid::new_v4()))
        })
    }
}

/// How a [`MockConnector`] answers primary authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAuth {
    Accept,
    Reject,
    /// Asks for this verification code.
    Challenge { code: String },
}

/// A connector that counts attempts and answers per [`MockAuth`].
pub struct MockConnector<H> {
    handle: H,
    behavior: MockAuth,
    delay: Option<Duration>,
    attempts: Arc<AtomicUsize>,
    trusted: Arc<AtomicBool>,
    expected: Option<Credentials>,
}

impl<H: Clone + Send + Sync + 'static> MockConnector<H> {
    pub fn new(handle: H, behavior: MockAuth) -> Self {
        Self {
            handle,
            behavior,
            delay: None,
            attempts: Arc::new(AtomicUsize::new(0)),
            trusted: Arc::new(AtomicBool::new(false)),
            expected: None,
        }
    }

    /// Sleeps before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Rejects any credentials other than these.
    pub fn expecting(mut self, credentials: Credentials) -> Self {
        self.expected = Some(credentials);
        self
    }

    /// Shared counter of primary authentication attempts.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    /// Set once a challenge session has been marked trusted.
    pub fn trusted(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.trusted)
    }
}

impl<H: Clone + Send + Sync + 'static> Connector for MockConnector<H> {
    type Handle = H;

    fn backend(&self) -> &'static str {
        "mock"
    }

    fn connect(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, ProviderResult<AuthOutcome<Self::Handle>>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.expected.as_ref().is_some_and(|e| *e != credentials) {
                return Err(ProviderError::authentication_rejected(
                    "mock backend rejected the credentials",
                ));
            }
            match &self.behavior {
                MockAuth::Accept => Ok(AuthOutcome::Authenticated(self.handle.clone())),
                MockAuth::Reject => Err(ProviderError::authentication_rejected(
                    "mock backend rejected the credentials",
                )),
                MockAuth::Challenge { code } => {
                    Ok(AuthOutcome::ChallengeRequired(Box::new(MockChallenge {
                        code: code.clone(),
                        handle: self.handle.clone(),
                        trusted: Arc::clone(&self.trusted),
                    })))
                }
            }
        })
    }
}

struct MockChallenge<H> {
    code: String,
    handle: H,
    trusted: Arc<AtomicBool>,
}

impl<H: Clone + Send + Sync + 'static> PendingChallenge<H> for MockChallenge<H> {
    fn prompt(&self) -> String {
        "Enter the verification code sent to your device".to_string()
    }

    fn submit(&mut self, code: String) -> BoxFuture<'_, ProviderResult<H>> {
        Box::pin(async move {
            if code.trim() == self.code {
                Ok(self.handle.clone())
            } else {
                Err(ProviderError::challenge_failed(
                    "the verification code was not accepted",
                ))
            }
        })
    }

    fn trust_session(&mut self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            self.trusted.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[derive(Default)]
struct StoreState {
    lists: Vec<NativeReminderList>,
    reminders: Vec<NativeReminder>,
}

/// A native reminder store that answers synchronously from memory.
pub struct MockReminderStore {
    status: Mutex<AuthorizationStatus>,
    grant: bool,
    silent: bool,
    access_requests: Arc<AtomicUsize>,
    state: Mutex<StoreState>,
}

impl Default for MockReminderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReminderStore {
    pub const DEFAULT_LIST: &'static str = "default";

    /// An authorized store with one list, [`Self::DEFAULT_LIST`].
    pub fn new() -> Self {
        Self {
            status: Mutex::new(AuthorizationStatus::Authorized),
            grant: true,
            silent: false,
            access_requests: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(StoreState {
                lists: vec![NativeReminderList {
                    identifier: Some(Self::DEFAULT_LIST.to_string()),
                    title: Some("Reminders".to_string()),
                }],
                reminders: Vec::new(),
            }),
        }
    }

    pub fn with_status(self, status: AuthorizationStatus) -> Self {
        *lock(&self.status) = status;
        self
    }

    pub fn with_list(self, identifier: &str, title: &str) -> Self {
        lock(&self.state).lists.push(NativeReminderList {
            identifier: Some(identifier.to_string()),
            title: Some(title.to_string()),
        });
        self
    }

    pub fn with_reminder(self, reminder: NativeReminder) -> Self {
        lock(&self.state).reminders.push(reminder);
        self
    }

    /// Access requests are answered with a refusal.
    pub fn refusing_access(mut self) -> Self {
        self.grant = false;
        self
    }

    /// Callbacks are dropped without being called.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn access_requests(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.access_requests)
    }

    fn answer<T>(&self, completion: Callback<StoreResult<T>>, value: impl FnOnce() -> T) {
        if !self.silent {
            completion(Ok(value()));
        }
    }
}

impl NativeReminderStore for MockReminderStore {
    fn authorization_status(&self) -> AuthorizationStatus {
        *lock(&self.status)
    }

    fn request_access(&self, completion: Callback<StoreResult<bool>>) {
        self.access_requests.fetch_add(1, Ordering::SeqCst);
        *lock(&self.status) = if self.grant {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.answer(completion, || self.grant);
    }

    fn lists(&self, completion: Callback<StoreResult<Vec<NativeReminderList>>>) {
        self.answer(completion, || lock(&self.state).lists.clone());
    }

    fn default_list(&self, completion: Callback<StoreResult<Option<NativeReminderList>>>) {
        self.answer(completion, || lock(&self.state).lists.first().cloned());
    }

    fn fetch(
        &self,
        predicate: ReminderPredicate,
        completion: Callback<StoreResult<Vec<NativeReminder>>>,
    ) {
        self.answer(completion, || {
            lock(&self.state)
                .reminders
                .iter()
                .filter(|r| predicate.matches(r))
                .cloned()
                .collect()
        });
    }

    fn save(&self, reminder: NativeReminder, completion: Callback<StoreResult<NativeReminder>>) {
        self.answer(completion, || {
            let mut reminder = reminder;
            let id = reminder
                .identifier
                .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone();
            let mut state = lock(&self.state);
            match state
                .reminders
                .iter_mut()
                .find(|r| r.identifier.as_deref() == Some(id.as_str()))
            {
                Some(existing) => *existing = reminder.clone(),
                None => state.reminders.push(reminder.clone()),
            }
            reminder
        });
    }
}
