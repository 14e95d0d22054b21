use chrono::Utc;
use member_intake::workflows::membership::{
    Application, ApplicationId, ApplicationStatus, ApplicationStore, ContactChannelId,
    KnowledgeBaseSync, NewApplication, NotificationError, Notifier, StorageError, SyncRow, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store double for the CLI demo; nothing touches disk.
#[derive(Default)]
pub(crate) struct InMemoryApplicationStore {
    state: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: u64,
    applications: Vec<Application>,
}

impl ApplicationStore for InMemoryApplicationStore {
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

/// Prints pushed rows instead of calling an external service.
#[derive(Default)]
pub(crate) struct ConsoleSync;

impl KnowledgeBaseSync for ConsoleSync {
    fn push(&self, row: &SyncRow) -> bool {
        println!("  [sync] knowledge base row created: {}", row.title);
        true
    }
}

/// Prints outbound applicant messages for the demo transcript.
#[derive(Default)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(&self, channel: ContactChannelId, text: &str) -> Result<(), NotificationError> {
        println!("  [notify -> channel {}] {}", channel.0, text);
        Ok(())
    }
}
