//! Authentication entry points for remote backends.
//!
//! A [`Connector`] turns account credentials into an authenticated adapter
//! handle. Some backends accept the secret outright; others answer with a
//! [`PendingChallenge`] that must be completed with an out-of-band code.

use std::fmt;
use std::sync::Arc;

use crate::adapter::{BoxFuture, CalendarAdapter, MailAdapter};
use crate::error::ProviderResult;

/// Account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// The part of the identifier after `@`, if it looks like an address.
    pub fn domain(&self) -> Option<&str> {
        self.identifier
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// An authentication step waiting for a verification code.
pub trait PendingChallenge<H>: Send + Sync {
    /// Text shown to the operator when asking for the code.
    fn prompt(&self) -> String;

    /// Submits a code. A rejected code leaves the challenge usable for
    /// another attempt.
    fn submit(&mut self, code: String) -> BoxFuture<'_, ProviderResult<H>>;

    /// Asks the backend to remember this session as trusted. Backends that
    /// have no such notion keep the default.
    fn trust_session(&mut self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Result of primary authentication.
pub enum AuthOutcome<H> {
    /// The backend accepted the credentials.
    Authenticated(H),
    /// The backend wants an additional verification code.
    ChallengeRequired(Box<dyn PendingChallenge<H>>),
}

impl<H> fmt::Debug for AuthOutcome<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated(_) => f.write_str("Authenticated"),
            Self::ChallengeRequired(c) => write!(f, "ChallengeRequired({:?})", c.prompt()),
        }
    }
}

/// Establishes authenticated sessions for one backend.
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    /// Backend name used in logs and error context.
    fn backend(&self) -> &'static str;

    /// Performs primary authentication.
    ///
    /// Rejected credentials are reported as
    /// [`crate::ProviderErrorCode::AuthenticationRejected`].
    fn connect(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, ProviderResult<AuthOutcome<Self::Handle>>>;
}

/// Handle type produced by calendar connectors.
pub type CalendarHandle = Arc<dyn CalendarAdapter>;

/// Handle type produced by mail connectors.
pub type MailHandle = Arc<dyn MailAdapter>;

/// A calendar connector as stored by the gateway.
pub type DynCalendarConnector = Arc<dyn Connector<Handle = CalendarHandle>>;

/// A mail connector as stored by the gateway.
pub type DynMailConnector = Arc<dyn Connector<Handle = MailHandle>>;
