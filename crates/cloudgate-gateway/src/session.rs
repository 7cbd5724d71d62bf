//! Session Manager: one lazily authenticated session per remote backend.
//!
//! ```text
//!                connect ok
//! Unauthenticated ─────────────────────────────▶ Authenticated
//!   │  ▲                                              ▲
//!   │  │ rejected / error                             │ valid code
//!   │  └──────────                                    │
//!   │ challenge                                       │
//!   └──────────────▶ AwaitingChallenge ───────────────┘
//!                     │  ▲ wrong code / timeout
//!                     └──┘
//! ```
//!
//! Each session's state sits behind one async mutex, so only one
//! authentication attempt runs at a time. Callers that queued behind an
//! attempt take its outcome instead of starting their own. Failures are not
//! memoized past that point: the next call starts again from the state the
//! machine is in.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cloudgate_providers::{
    AuthOutcome, CalendarHandle, Connector, Credentials, DynCalendarConnector, DynMailConnector,
    MailHandle, PendingChallenge, ProviderError, ProviderResult,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::challenge::ChallengePrompt;
use crate::config::GatewayConfig;
use crate::credentials::CredentialProvider;

/// Observable lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    AwaitingChallenge,
    Authenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingChallenge => "awaiting_challenge",
            Self::Authenticated => "authenticated",
        })
    }
}

enum SessionState<H> {
    Unauthenticated,
    AwaitingChallenge(Box<dyn PendingChallenge<H>>),
    Authenticated(H),
}

impl<H> SessionState<H> {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::AwaitingChallenge(_) => SessionStatus::AwaitingChallenge,
            Self::Authenticated(_) => SessionStatus::Authenticated,
        }
    }
}

struct Inner<H> {
    state: SessionState<H>,
    /// Failure of the most recent attempt, tagged with its epoch.
    last_failure: Option<(u64, ProviderError)>,
}

/// Shared collaborators of every session.
#[derive(Clone)]
pub struct SessionContext {
    pub credentials: Arc<dyn CredentialProvider>,
    pub prompt: Arc<dyn ChallengePrompt>,
    pub challenge_timeout: Duration,
}

/// The authenticated-handle holder for one backend.
pub struct Session<H> {
    backend: &'static str,
    connector: Arc<dyn Connector<Handle = H>>,
    context: SessionContext,
    inner: Mutex<Inner<H>>,
    /// Bumped each time an attempt finishes.
    epoch: AtomicU64,
}

impl<H: Clone + Send + Sync + 'static> Session<H> {
    pub fn new(connector: Arc<dyn Connector<Handle = H>>, context: SessionContext) -> Self {
        Self {
            backend: connector.backend(),
            connector,
            context,
            inner: Mutex::new(Inner {
                state: SessionState::Unauthenticated,
                last_failure: None,
            }),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.state.status()
    }

    /// Returns the authenticated handle, authenticating first if needed.
    pub async fn ensure(&self) -> ProviderResult<H> {
        let observed = self.epoch.load(Ordering::SeqCst);
        let mut inner = self.inner.lock().await;

        if let SessionState::Authenticated(handle) = &inner.state {
            return Ok(handle.clone());
        }
        let current = self.epoch.load(Ordering::SeqCst);
        if current != observed
            && let Some((epoch, error)) = &inner.last_failure
            && *epoch == current
        {
            debug!(backend = self.backend, "Sharing outcome of concurrent attempt");
            return Err(error.detached());
        }

        let result = self.advance(&mut inner).await;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        match result {
            Ok(handle) => {
                inner.last_failure = None;
                Ok(handle)
            }
            Err(error) => {
                let error = error.or_provider(self.backend);
                warn!(
                    backend = self.backend,
                    state = %inner.state.status(),
                    error = %error,
                    "Authentication failed"
                );
                inner.last_failure = Some((epoch, error.detached()));
                Err(error)
            }
        }
    }

    /// Runs the state machine from its current state to `Authenticated` or a
    /// failure.
    async fn advance(&self, inner: &mut Inner<H>) -> ProviderResult<H> {
        let state = std::mem::replace(&mut inner.state, SessionState::Unauthenticated);
        let mut challenge = match state {
            SessionState::Authenticated(handle) => {
                inner.state = SessionState::Authenticated(handle.clone());
                return Ok(handle);
            }
            SessionState::AwaitingChallenge(challenge) => challenge,
            SessionState::Unauthenticated => {
                let credentials = self.credentials()?;
                debug!(backend = self.backend, account = %credentials.identifier, "Authenticating");
                match self.connector.connect(credentials).await? {
                    AuthOutcome::Authenticated(handle) => {
                        info!(backend = self.backend, "Session authenticated");
                        inner.state = SessionState::Authenticated(handle.clone());
                        return Ok(handle);
                    }
                    AuthOutcome::ChallengeRequired(challenge) => {
                        info!(backend = self.backend, "Backend requested a verification code");
                        challenge
                    }
                }
            }
        };

        match self.complete_challenge(challenge.as_mut()).await {
            Ok(handle) => {
                if let Err(e) = challenge.trust_session().await {
                    warn!(backend = self.backend, error = %e, "Could not mark session as trusted");
                }
                info!(backend = self.backend, "Session authenticated after verification");
                inner.state = SessionState::Authenticated(handle.clone());
                Ok(handle)
            }
            Err(error) => {
                inner.state = SessionState::AwaitingChallenge(challenge);
                Err(error)
            }
        }
    }

    fn credentials(&self) -> ProviderResult<Credentials> {
        let found = self.context.credentials.lookup().map_err(|e| {
            ProviderError::not_configured(format!("credential store unavailable: {e}"))
        })?;
        found.ok_or_else(|| {
            ProviderError::not_configured(format!(
                "no credentials stored for {}; run `cloudgate auth store`",
                self.context.credentials.describe()
            ))
        })
    }

    async fn complete_challenge(
        &self,
        challenge: &mut dyn PendingChallenge<H>,
    ) -> ProviderResult<H> {
        let message = challenge.prompt();
        let timeout = self.context.challenge_timeout;
        let code = tokio::time::timeout(
            timeout,
            self.context.prompt.request_code(self.backend, &message),
        )
        .await
        .map_err(|_| {
            ProviderError::challenge_failed(format!(
                "no verification code entered within {}s",
                timeout.as_secs()
            ))
        })?
        .ok_or_else(|| ProviderError::challenge_failed("no verification code was entered"))?;

        challenge.submit(code).await
    }
}

/// The gateway's sessions, keyed by backend.
pub struct SessionRegistry {
    calendar: Session<CalendarHandle>,
    mail: Session<MailHandle>,
}

impl SessionRegistry {
    pub fn new(
        calendar: DynCalendarConnector,
        mail: DynMailConnector,
        credentials: Arc<dyn CredentialProvider>,
        prompt: Arc<dyn ChallengePrompt>,
        config: &GatewayConfig,
    ) -> Self {
        let context = SessionContext {
            credentials,
            prompt,
            challenge_timeout: config.challenge_timeout,
        };
        Self {
            calendar: Session::new(calendar, context.clone()),
            mail: Session::new(mail, context),
        }
    }

    pub fn calendar(&self) -> &Session<CalendarHandle> {
        &self.calendar
    }

    pub fn mail(&self) -> &Session<MailHandle> {
        &self.mail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use cloudgate_providers::{BoxFuture, ProviderErrorCode};
    use cloudgate_providers::mock::{MockAuth, MockConnector};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Answers with queued codes, one per request.
    struct ScriptedPrompt {
        codes: StdMutex<VecDeque<Option<String>>>,
        delay: Option<Duration>,
    }

    impl ScriptedPrompt {
        fn new(codes: &[Option<&str>]) -> Self {
            Self {
                codes: StdMutex::new(codes.iter().map(|c| c.map(str::to_string)).collect()),
                delay: None,
            }
        }
    }

    impl ChallengePrompt for ScriptedPrompt {
        fn request_code<'a>(&'a self, _: &'a str, _: &'a str) -> BoxFuture<'a, Option<String>> {
            Box::pin(async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                self.codes.lock().unwrap().pop_front().flatten()
            })
        }
    }

    fn context(prompt: ScriptedPrompt) -> SessionContext {
        SessionContext {
            credentials: Arc::new(StaticCredentials::new(Credentials::new(
                "a@example.com",
                "s3cr3t",
            ))),
            prompt: Arc::new(prompt),
            challenge_timeout: Duration::from_millis(200),
        }
    }

    fn session(connector: MockConnector<u32>, prompt: ScriptedPrompt) -> Session<u32> {
        Session::new(Arc::new(connector), context(prompt))
    }

    #[tokio::test]
    async fn fast_path_memoizes_handle() {
        let connector = MockConnector::new(7u32, MockAuth::Accept);
        let attempts = connector.attempts();
        let session = session(connector, ScriptedPrompt::new(&[]));

        assert_eq!(session.status().await, SessionStatus::Unauthenticated);
        assert_eq!(session.ensure().await.unwrap(), 7);
        assert_eq!(session.ensure().await.unwrap(), 7);
        assert_eq!(session.status().await, SessionStatus::Authenticated);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_use_authenticates_once() {
        let connector =
            MockConnector::new(1u32, MockAuth::Accept).with_delay(Duration::from_millis(50));
        let attempts = connector.attempts();
        let session = Arc::new(session(connector, ScriptedPrompt::new(&[])));

        let (a, b, c) = tokio::join!(session.ensure(), session.ensure(), session.ensure());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_waiters_share_a_rejection() {
        let connector =
            MockConnector::new(1u32, MockAuth::Reject).with_delay(Duration::from_millis(50));
        let attempts = connector.attempts();
        let session = session(connector, ScriptedPrompt::new(&[]));

        let (a, b) = tokio::join!(session.ensure(), session.ensure());
        assert_eq!(a.unwrap_err().code(), ProviderErrorCode::AuthenticationRejected);
        assert_eq!(b.unwrap_err().code(), ProviderErrorCode::AuthenticationRejected);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejection_is_not_memoized() {
        let connector = MockConnector::new(1u32, MockAuth::Reject);
        let attempts = connector.attempts();
        let session = session(connector, ScriptedPrompt::new(&[]));

        let err = session.ensure().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationRejected);
        assert_eq!(err.provider(), Some("mock"));
        assert_eq!(session.status().await, SessionStatus::Unauthenticated);

        session.ensure().await.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credentials_are_not_configured() {
        let connector = MockConnector::new(1u32, MockAuth::Accept);
        let attempts = connector.attempts();
        let session = Session::new(
            Arc::new(connector),
            SessionContext {
                credentials: Arc::new(StaticCredentials::none()),
                ..context(ScriptedPrompt::new(&[]))
            },
        );

        let err = session.ensure().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotConfigured);
        assert!(err.message().contains("cloudgate auth store"));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn challenge_accepts_valid_code_and_trusts_session() {
        let connector = MockConnector::new(
            3u32,
            MockAuth::Challenge {
                code: "123456".into(),
            },
        );
        let trusted = connector.trusted();
        let session = session(connector, ScriptedPrompt::new(&[Some("123456")]));

        assert_eq!(session.ensure().await.unwrap(), 3);
        assert_eq!(session.status().await, SessionStatus::Authenticated);
        assert!(trusted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wrong_code_keeps_awaiting_challenge() {
        let connector = MockConnector::new(
            3u32,
            MockAuth::Challenge {
                code: "123456".into(),
            },
        );
        let attempts = connector.attempts();
        let session = session(
            connector,
            ScriptedPrompt::new(&[Some("000000"), Some("123456")]),
        );

        let err = session.ensure().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ChallengeFailed);
        assert_eq!(session.status().await, SessionStatus::AwaitingChallenge);

        // The next call asks for a code again without resubmitting the secret.
        assert_eq!(session.ensure().await.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn challenge_times_out() {
        let connector = MockConnector::new(
            3u32,
            MockAuth::Challenge {
                code: "123456".into(),
            },
        );
        let mut prompt = ScriptedPrompt::new(&[Some("123456")]);
        prompt.delay = Some(Duration::from_secs(5));
        let session = session(connector, prompt);

        let err = session.ensure().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ChallengeFailed);
        assert!(err.message().contains("within"));
    }

    #[tokio::test]
    async fn no_code_entered_fails_challenge() {
        let connector = MockConnector::new(
            3u32,
            MockAuth::Challenge {
                code: "123456".into(),
            },
        );
        let session = session(connector, ScriptedPrompt::new(&[None]));
        let err = session.ensure().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ChallengeFailed);
    }
}
