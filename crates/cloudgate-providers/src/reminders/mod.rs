//! Local reminder backend.
//!
//! [`NativeReminderStore`] is the callback-based contract of a platform task
//! store; [`NativeReminderAdapter`] turns it into a [`crate::ReminderAdapter`]
//! with bounded waits. [`FileReminderStore`] is the bundled store.

mod file;
mod native;
mod store;

pub use file::{DEFAULT_LIST_TITLE, FileReminderStore};
pub use native::NativeReminderAdapter;
pub use store::{AuthorizationStatus, Callback, NativeReminderStore, StoreError, StoreResult};
