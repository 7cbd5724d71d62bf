//! A JSON-file reminder store served by a worker thread.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapter::ReminderPredicate;
use crate::raw::{NativeReminder, NativeReminderList};

use super::store::{AuthorizationStatus, Callback, NativeReminderStore, StoreResult};

/// Title of the list created when the store holds none.
pub const DEFAULT_LIST_TITLE: &str = "Reminders";

type Job = Box<dyn FnOnce(&StoreFiles) + Send + 'static>;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreData {
    default_list: Option<String>,
    lists: Vec<NativeReminderList>,
    reminders: Vec<NativeReminder>,
}

impl StoreData {
    /// Creates the default list when the store has none.
    fn with_default_list(mut self) -> Self {
        if self.lists.is_empty() {
            let id = uuid::Uuid::new_v4().to_string();
            self.lists.push(NativeReminderList {
                identifier: Some(id.clone()),
                title: Some(DEFAULT_LIST_TITLE.to_string()),
            });
            self.default_list = Some(id);
        }
        if self.default_list.is_none() {
            self.default_list = self.lists.iter().find_map(|l| l.identifier.clone());
        }
        self
    }
}

/// File paths owned by the worker thread.
struct StoreFiles {
    path: PathBuf,
}

impl StoreFiles {
    fn load(&self) -> StoreResult<StoreData> {
        let data = match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreData::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };
        if data.lists.is_empty() || data.default_list.is_none() {
            let data = data.with_default_list();
            self.persist(&data)?;
            return Ok(data);
        }
        Ok(data)
    }

    /// Writes to a sibling temp file, then renames over the store.
    fn persist(&self, data: &StoreData) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<bool> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        if let Err(e) = fs::create_dir_all(dir) {
            return denied_or(e);
        }
        let probe = dir.join(".cloudgate-access-probe");
        match fs::write(&probe, b"") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                Ok(true)
            }
            Err(e) => denied_or(e),
        }
    }
}

fn denied_or(e: std::io::Error) -> StoreResult<bool> {
    if e.kind() == ErrorKind::PermissionDenied {
        Ok(false)
    } else {
        Err(e.into())
    }
}

/// Reminder store persisted as JSON.
///
/// All file access happens on one worker thread, which invokes each
/// callback when its job finishes.
pub struct FileReminderStore {
    path: PathBuf,
    jobs: mpsc::Sender<Job>,
    status: Arc<Mutex<AuthorizationStatus>>,
}

impl FileReminderStore {
    /// Starts the worker for the store at `path`. The file is created on the
    /// first write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let (jobs, queue) = mpsc::channel::<Job>();
        let files = StoreFiles { path: path.clone() };

        thread::Builder::new()
            .name("reminder-store".into())
            .spawn(move || {
                for job in queue {
                    job(&files);
                }
                debug!("Reminder store worker stopped");
            })?;

        Ok(Self {
            path,
            jobs,
            status: Arc::new(Mutex::new(AuthorizationStatus::NotDetermined)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn submit(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            // Dropping the job drops its callback, which the adapter reports.
            warn!("Reminder store worker is gone");
        }
    }
}

impl NativeReminderStore for FileReminderStore {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(AuthorizationStatus::Restricted)
    }

    fn request_access(&self, completion: Callback<StoreResult<bool>>) {
        let status = Arc::clone(&self.status);
        self.submit(Box::new(move |files| {
            let result = files.check_writable();
            if let (Ok(granted), Ok(mut guard)) = (&result, status.lock()) {
                *guard = if *granted {
                    AuthorizationStatus::Authorized
                } else {
                    AuthorizationStatus::Denied
                };
            }
            completion(result);
        }));
    }

    fn lists(&self, completion: Callback<StoreResult<Vec<NativeReminderList>>>) {
        self.submit(Box::new(move |files| {
            completion(files.load().map(|data| data.lists));
        }));
    }

    fn default_list(&self, completion: Callback<StoreResult<Option<NativeReminderList>>>) {
        self.submit(Box::new(move |files| {
            completion(files.load().map(|data| {
                let id = data.default_list.clone();
                data.lists.into_iter().find(|l| l.identifier == id)
            }));
        }));
    }

    fn fetch(
        &self,
        predicate: ReminderPredicate,
        completion: Callback<StoreResult<Vec<NativeReminder>>>,
    ) {
        self.submit(Box::new(move |files| {
            completion(files.load().map(|data| {
                data.reminders
                    .into_iter()
                    .filter(|r| predicate.matches(r))
                    .collect()
            }));
        }));
    }

    fn save(&self, reminder: NativeReminder, completion: Callback<StoreResult<NativeReminder>>) {
        self.submit(Box::new(move |files| {
            let result = files.load().and_then(|mut data| {
                let mut reminder = reminder;
                let id = reminder
                    .identifier
                    .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                    .clone();
                match data
                    .reminders
                    .iter_mut()
                    .find(|r| r.identifier.as_deref() == Some(id.as_str()))
                {
                    Some(existing) => *existing = reminder.clone(),
                    None => data.reminders.push(reminder.clone()),
                }
                files.persist(&data)?;
                Ok(reminder)
            });
            completion(result);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{NewReminder, ReminderAdapter};
    use crate::reminders::NativeReminderAdapter;
    use std::time::Duration;

    fn adapter_at(path: &Path) -> NativeReminderAdapter {
        let store = FileReminderStore::open(path).unwrap();
        NativeReminderAdapter::new(Arc::new(store)).with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn creates_default_list_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_at(&dir.path().join("reminders.json"));

        let lists = adapter.list_lists().await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].title.as_deref(), Some(DEFAULT_LIST_TITLE));

        let default = adapter.default_list().await.unwrap().unwrap();
        assert_eq!(default.identifier, lists[0].identifier);
    }

    #[tokio::test]
    async fn reminders_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reminders.json");

        let first = adapter_at(&path);
        let list = first.default_list().await.unwrap().unwrap();
        let created = first
            .create_reminder(NewReminder {
                title: "Call dentist".into(),
                list_id: list.identifier.clone().unwrap(),
                due: None,
                notes: None,
                priority: 1,
            })
            .await
            .unwrap();
        assert!(created.identifier.is_some());
        assert!(path.exists());

        let second = adapter_at(&path);
        let reminders = second.fetch_reminders(Default::default()).await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].title.as_deref(), Some("Call dentist"));
        assert_eq!(reminders[0].list_identifier, list.identifier);

        // The default list keeps its identifier once persisted.
        let again = second.default_list().await.unwrap().unwrap();
        assert_eq!(again.identifier, list.identifier);
    }

    #[tokio::test]
    async fn complete_marks_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let adapter = adapter_at(&path);
        let list = adapter.default_list().await.unwrap().unwrap();
        let created = adapter
            .create_reminder(NewReminder {
                title: "Water plants".into(),
                list_id: list.identifier.unwrap(),
                due: None,
                notes: None,
                priority: 0,
            })
            .await
            .unwrap();

        let uid = created.identifier.unwrap();
        assert!(adapter.complete_reminder(uid).await.unwrap());
        assert!(!adapter.complete_reminder("nope".into()).await.unwrap());

        let raw = fs::read_to_string(&path).unwrap();
        let data: StoreData = serde_json::from_str(&raw).unwrap();
        assert_eq!(data.reminders.len(), 1);
        assert!(data.reminders[0].is_completed());
        assert!(data.reminders[0].completion_date.is_some());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        fs::write(&path, "{not json").unwrap();

        let err = adapter_at(&path).list_lists().await.unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::InvalidResponse);
    }

    #[test]
    fn access_probe_grants_writable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let files = StoreFiles {
            path: dir.path().join("reminders.json"),
        };
        assert!(files.check_writable().unwrap());
        assert!(!dir.path().join(".cloudgate-access-probe").exists());
    }
}
