use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::workflows::membership::domain::{
    ApplicantIdentity, Application, ApplicationId, ApplicationStatus, ContactChannelId, UserId,
};
use crate::workflows::membership::intake::IntakeCoordinator;
use crate::workflows::membership::lifecycle::{AdminRoster, LifecycleController};
use crate::workflows::membership::notify::{NotificationError, Notifier};
use crate::workflows::membership::repository::{ApplicationStore, NewApplication, StorageError};
use crate::workflows::membership::survey::SurveyDefinition;
use crate::workflows::membership::sync::{KnowledgeBaseSync, SyncRow};

pub(super) const ADMIN: UserId = UserId(1);
pub(super) const NON_ADMIN: UserId = UserId(2);
pub(super) const INVITE: &str = "https://community.example.com/join";

pub(super) fn identity(applicant: i64) -> ApplicantIdentity {
    ApplicantIdentity {
        applicant_id: UserId(applicant),
        contact_channel_id: ContactChannelId(applicant),
        username: Some(format!("user{applicant}")),
        display_name: Some(format!("User {applicant}")),
    }
}

pub(super) fn full_answers() -> BTreeMap<String, String> {
    let mut answers = BTreeMap::new();
    answers.insert("full_name".to_string(), "Ada Lovelace".to_string());
    answers.insert("age".to_string(), "36".to_string());
    answers.insert("time".to_string(), "10 hours a week".to_string());
    answers.insert("experience".to_string(), "https://example.com/work".to_string());
    answers.insert("goals".to_string(), "Build useful things".to_string());
    answers
}

pub(super) fn submission(applicant: i64) -> NewApplication {
    let identity = identity(applicant);
    NewApplication {
        applicant_id: identity.applicant_id,
        contact_channel_id: identity.contact_channel_id,
        username: identity.username,
        display_name: identity.display_name,
        answers: full_answers(),
    }
}

pub(super) type TestController = LifecycleController<MemoryStore, RecordingSync, RecordingNotifier>;

pub(super) fn build_controller() -> (
    Arc<TestController>,
    Arc<MemoryStore>,
    Arc<RecordingSync>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let sync = Arc::new(RecordingSync::succeeding());
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        sync.clone(),
        notifier.clone(),
        AdminRoster::new([ADMIN]),
        SurveyDefinition::standard(),
        Some(INVITE.to_string()),
    ));
    (controller, store, sync, notifier)
}

pub(super) fn build_coordinator() -> (
    Arc<IntakeCoordinator<MemoryStore, RecordingSync, RecordingNotifier>>,
    Arc<TestController>,
    Arc<MemoryStore>,
    Arc<RecordingSync>,
    Arc<RecordingNotifier>,
) {
    let (controller, store, sync, notifier) = build_controller();
    let coordinator = Arc::new(IntakeCoordinator::new(controller.clone()));
    (coordinator, controller, store, sync, notifier)
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    applications: Vec<Application>,
}

impl ApplicationStore for MemoryStore {
    fn create(&self, submission: NewApplication) -> Result<Application, StorageError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.next_id += 1;
        let now = Utc::now();
        let application = Application {
            id: ApplicationId(state.next_id),
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
        state.applications.push(application.clone());
        Ok(application)
    }

    fn get(&self, id: ApplicationId) -> Result<Option<Application>, StorageError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .iter()
            .find(|application| application.id == id)
            .cloned())
    }

    fn list_pending(&self, limit: usize) -> Result<Vec<Application>, StorageError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .iter()
            .filter(|application| application.status == ApplicationStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_by_applicant(&self, applicant: UserId) -> Result<Vec<Application>, StorageError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .iter()
            .rev()
            .filter(|application| application.applicant_id == applicant)
            .cloned()
            .collect())
    }

    fn latest_for_applicant(&self, applicant: UserId) -> Result<Option<Application>, StorageError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .iter()
            .rev()
            .find(|application| application.applicant_id == applicant)
            .cloned())
    }

    fn list_all(&self) -> Result<Vec<Application>, StorageError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.applications.clone())
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        comment: Option<String>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let application = state
            .applications
            .iter_mut()
            .find(|application| application.id == id)
            .ok_or(StorageError::NotFound(id))?;
        application.status = status;
        application.admin_comment = comment;
        application.updated_at = Utc::now();
        Ok(())
    }

    fn mark_synced(&self, id: ApplicationId) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let application = state
            .applications
            .iter_mut()
            .find(|application| application.id == id)
            .ok_or(StorageError::NotFound(id))?;
        application.synced = true;
        application.updated_at = Utc::now();
        Ok(())
    }
}

/// Sync double that records every pushed row and reports a configurable outcome.
pub(super) struct RecordingSync {
    outcome: AtomicBool,
    calls: AtomicUsize,
    rows: Mutex<Vec<SyncRow>>,
}

impl RecordingSync {
    pub(super) fn succeeding() -> Self {
        Self {
            outcome: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn set_outcome(&self, succeed: bool) {
        self.outcome.store(succeed, Ordering::Relaxed);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub(super) fn rows(&self) -> Vec<SyncRow> {
        self.rows.lock().expect("sync mutex poisoned").clone()
    }
}

impl KnowledgeBaseSync for RecordingSync {
    fn push(&self, row: &SyncRow) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.rows
            .lock()
            .expect("sync mutex poisoned")
            .push(row.clone());
        self.outcome.load(Ordering::Relaxed)
    }
}

/// Notifier double that records outbound messages and can be made to fail.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    fail: AtomicBool,
    messages: Mutex<Vec<(ContactChannelId, String)>>,
}

impl RecordingNotifier {
    pub(super) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub(super) fn messages(&self) -> Vec<(ContactChannelId, String)> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, channel: ContactChannelId, text: &str) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(NotificationError::Transport("transport offline".to_string()));
        }
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push((channel, text.to_string()));
        Ok(())
    }
}
