use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationStatus, UserId};
use super::repository::{ApplicationStore, NewApplication, StorageError};

/// Durable record store backed by a single JSON file.
///
/// Application volume is human-paced, so every operation takes the one lock and
/// mutations rewrite the whole file. Writes go to a temp file first and are
/// renamed into place, so a crashed write never leaves a partial state visible.
pub struct JsonFileStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    state: StoreState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    next_id: u64,
    applications: Vec<Application>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating parent directories and an empty
    /// state when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            StoreState {
                next_id: 1,
                applications: Vec::new(),
            }
        };

        Ok(Self {
            inner: Mutex::new(StoreInner { path, state }),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl StoreInner {
    fn persist(&self) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn find_mut(&mut self, id: ApplicationId) -> Result<&mut Application, StorageError> {
        self.state
            .applications
            .iter_mut()
            .find(|application| application.id == id)
            .ok_or(StorageError::NotFound(id))
    }
}

impl ApplicationStore for JsonFileStore {
    fn create(&self, submission: NewApplication) -> Result<Application, StorageError> {
        let mut inner = self.lock()?;
        let now = Utc::now();
        let id = ApplicationId(inner.state.next_id);

        let application = Application {
            id,
            applicant_id: submission.applicant_id,
            contact_channel_id: submission.contact_channel_id,
            username: submission.username,
            display_name: submission.display_name,
            answers: submission.answers,
            status: ApplicationStatus::Pending,
            admin_comment: None,
            created_at: now,
            updated_at: now,
            synced: false,
        };

        inner.state.next_id += 1;
        inner.state.applications.push(application.clone());
        inner.persist()?;
        Ok(application)
    }

    fn get(&self, id: ApplicationId) -> Result<Option<Application>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .applications
            .iter()
            .find(|application| application.id == id)
            .cloned())
    }

    fn list_pending(&self, limit: usize) -> Result<Vec<Application>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .applications
            .iter()
            .filter(|application| application.status == ApplicationStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_by_applicant(&self, applicant: UserId) -> Result<Vec<Application>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .applications
            .iter()
            .rev()
            .filter(|application| application.applicant_id == applicant)
            .cloned()
            .collect())
    }

    fn latest_for_applicant(&self, applicant: UserId) -> Result<Option<Application>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .applications
            .iter()
            .rev()
            .find(|application| application.applicant_id == applicant)
            .cloned())
    }

    fn list_all(&self) -> Result<Vec<Application>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.state.applications.clone())
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        comment: Option<String>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let application = inner.find_mut(id)?;
        application.status = status;
        application.admin_comment = comment;
        application.updated_at = Utc::now();
        inner.persist()
    }

    fn mark_synced(&self, id: ApplicationId) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let application = inner.find_mut(id)?;
        application.synced = true;
        application.updated_at = Utc::now();
        inner.persist()
    }
}
