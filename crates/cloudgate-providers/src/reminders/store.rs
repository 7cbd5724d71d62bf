//! The callback-driven contract of a native reminder store.

use thiserror::Error;

use crate::adapter::ReminderPredicate;
use crate::raw::{NativeReminder, NativeReminderList};

/// Completion handler invoked exactly once, possibly on another thread.
pub type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Result delivered to a store callback.
pub type StoreResult<T> = Result<T, StoreError>;

/// Whether the process may use the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// Access has never been requested.
    NotDetermined,
    Authorized,
    Denied,
    /// Access is blocked by policy and cannot be requested.
    Restricted,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("access to the store was not granted")]
    AccessDenied,
}

/// A reminder store whose operations complete through callbacks.
///
/// Implementations may call back synchronously or from any thread; a
/// callback that is never invoked is tolerated by the adapter's timeout.
pub trait NativeReminderStore: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Asks for access. The callback receives whether it was granted.
    fn request_access(&self, completion: Callback<StoreResult<bool>>);

    fn lists(&self, completion: Callback<StoreResult<Vec<NativeReminderList>>>);

    fn default_list(&self, completion: Callback<StoreResult<Option<NativeReminderList>>>);

    fn fetch(
        &self,
        predicate: ReminderPredicate,
        completion: Callback<StoreResult<Vec<NativeReminder>>>,
    );

    /// Inserts or replaces by identifier. Records without an identifier are
    /// assigned one; the callback receives the record as stored.
    fn save(&self, reminder: NativeReminder, completion: Callback<StoreResult<NativeReminder>>);
}
