//! [`ReminderAdapter`] over a callback-driven [`NativeReminderStore`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::adapter::{BoxFuture, NewReminder, ReminderAdapter, ReminderPredicate};
use crate::error::{ProviderError, ProviderResult};
use crate::raw::{NativeReminder, NativeReminderList};

use super::store::{AuthorizationStatus, Callback, NativeReminderStore, StoreError, StoreResult};

const BACKEND: &str = "reminders";

/// Bridges each store callback into an awaited result with a bounded wait.
pub struct NativeReminderAdapter {
    store: Arc<dyn NativeReminderStore>,
    timeout: Duration,
}

impl NativeReminderAdapter {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(store: Arc<dyn NativeReminderStore>) -> Self {
        Self {
            store,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issues one store call and waits for its callback.
    async fn bridge<T, F>(&self, operation: &'static str, call: F) -> ProviderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NativeReminderStore, Callback<StoreResult<T>>),
    {
        let (tx, rx) = oneshot::channel();
        call(
            self.store.as_ref(),
            Box::new(move |result| {
                // The receiver is gone once the wait has timed out.
                let _ = tx.send(result);
            }),
        );

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result.map_err(|e| store_error(operation, e)),
            Ok(Err(_)) => Err(ProviderError::internal(format!(
                "reminder store dropped the {} request",
                operation
            ))
            .with_provider(BACKEND)),
            Err(_) => Err(ProviderError::timeout(format!(
                "reminder store did not answer {} within {}s",
                operation,
                self.timeout.as_secs_f32()
            ))
            .with_provider(BACKEND)),
        }
    }

    /// Requests access on first use; denial fails every operation.
    async fn ensure_access(&self) -> ProviderResult<()> {
        match self.store.authorization_status() {
            AuthorizationStatus::Authorized => Ok(()),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => Err(denied()),
            AuthorizationStatus::NotDetermined => {
                debug!("Requesting reminder store access");
                let granted = self
                    .bridge("access request", |store, cb| store.request_access(cb))
                    .await?;
                if granted {
                    info!("Reminder store access granted");
                    Ok(())
                } else {
                    Err(denied())
                }
            }
        }
    }

    async fn fetch(&self, predicate: ReminderPredicate) -> ProviderResult<Vec<NativeReminder>> {
        self.bridge("fetch", move |store, cb| store.fetch(predicate, cb))
            .await
    }

    async fn save(&self, reminder: NativeReminder) -> ProviderResult<NativeReminder> {
        self.bridge("save", move |store, cb| store.save(reminder, cb))
            .await
    }
}

fn denied() -> ProviderError {
    ProviderError::permission_denied(
        "access to reminders has not been granted; allow it in the system settings",
    )
    .with_provider(BACKEND)
}

fn store_error(operation: &str, e: StoreError) -> ProviderError {
    let error = match e {
        StoreError::AccessDenied => denied(),
        StoreError::Corrupt(inner) => ProviderError::invalid_response(format!(
            "reminder store {} failed: {}",
            operation, inner
        ))
        .with_source(inner),
        other => {
            ProviderError::network(format!("reminder store {} failed: {}", operation, other))
                .with_source(other)
        }
    };
    error.or_provider(BACKEND)
}

impl ReminderAdapter for NativeReminderAdapter {
    fn name(&self) -> &str {
        BACKEND
    }

    fn list_lists(&self) -> BoxFuture<'_, ProviderResult<Vec<NativeReminderList>>> {
        Box::pin(async move {
            self.ensure_access().await?;
            self.bridge("list query", |store, cb| store.lists(cb)).await
        })
    }

    fn default_list(&self) -> BoxFuture<'_, ProviderResult<Option<NativeReminderList>>> {
        Box::pin(async move {
            self.ensure_access().await?;
            self.bridge("default list query", |store, cb| store.default_list(cb))
                .await
        })
    }

    fn fetch_reminders(
        &self,
        predicate: ReminderPredicate,
    ) -> BoxFuture<'_, ProviderResult<Vec<NativeReminder>>> {
        Box::pin(async move {
            self.ensure_access().await?;
            self.fetch(predicate).await
        })
    }

    fn create_reminder(
        &self,
        reminder: NewReminder,
    ) -> BoxFuture<'_, ProviderResult<NativeReminder>> {
        Box::pin(async move {
            self.ensure_access().await?;
            let record = NativeReminder {
                identifier: None,
                title: Some(reminder.title),
                notes: reminder.notes,
                completed: Some(false),
                completion_date: None,
                due_date: reminder.due,
                priority: Some(i64::from(reminder.priority)),
                list_identifier: Some(reminder.list_id),
            };
            self.save(record).await
        })
    }

    fn complete_reminder(&self, uid: String) -> BoxFuture<'_, ProviderResult<bool>> {
        Box::pin(async move {
            self.ensure_access().await?;
            let everything = ReminderPredicate {
                lists: None,
                include_completed: true,
            };
            let found = self
                .fetch(everything)
                .await?
                .into_iter()
                .find(|r| r.identifier.as_deref() == Some(uid.as_str()));

            let Some(mut reminder) = found else {
                debug!(uid = %uid, "No reminder to complete");
                return Ok(false);
            };
            reminder.completed = Some(true);
            reminder.completion_date = Some(Utc::now());
            self.save(reminder).await?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::mock::MockReminderStore;

    fn adapter(store: MockReminderStore) -> NativeReminderAdapter {
        NativeReminderAdapter::new(Arc::new(store)).with_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn requests_access_once() {
        let store = MockReminderStore::new().with_status(AuthorizationStatus::NotDetermined);
        let requests = store.access_requests();
        let adapter = adapter(store);

        adapter.list_lists().await.unwrap();
        adapter.list_lists().await.unwrap();
        assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_access_fails_every_operation() {
        let adapter = adapter(MockReminderStore::new().with_status(AuthorizationStatus::Denied));

        let err = adapter.list_lists().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::PermissionDenied);
        let err = adapter.complete_reminder("x".into()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn refused_request_is_permission_denied() {
        let store = MockReminderStore::new()
            .with_status(AuthorizationStatus::NotDetermined)
            .refusing_access();
        let err = adapter(store).fetch_reminders(Default::default()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn silent_store_times_out() {
        let err = adapter(MockReminderStore::new().silent())
            .list_lists()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Timeout);
        assert_eq!(err.provider(), Some("reminders"));
    }

    #[tokio::test]
    async fn create_then_complete() {
        let adapter = adapter(MockReminderStore::new());
        let created = adapter
            .create_reminder(NewReminder {
                title: "Buy milk".into(),
                list_id: "home".into(),
                due: None,
                notes: Some("2 litres".into()),
                priority: 5,
            })
            .await
            .unwrap();
        let uid = created.identifier.clone().unwrap();
        assert_eq!(created.priority, Some(5));

        assert!(adapter.complete_reminder(uid.clone()).await.unwrap());

        let open = adapter.fetch_reminders(Default::default()).await.unwrap();
        assert!(open.is_empty());

        let all = adapter
            .fetch_reminders(ReminderPredicate {
                lists: None,
                include_completed: true,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_completed());
        assert!(all[0].completion_date.is_some());
    }

    #[tokio::test]
    async fn completing_unknown_uid_is_not_an_error() {
        let adapter = adapter(MockReminderStore::new());
        assert!(!adapter.complete_reminder("missing".into()).await.unwrap());
    }
}
