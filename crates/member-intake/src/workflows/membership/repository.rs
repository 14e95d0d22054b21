use std::collections::BTreeMap;

use super::domain::{Application, ApplicationId, ApplicationStatus, ContactChannelId, UserId};

/// Everything the store needs to persist a brand new pending application.
///
/// The store does not validate `answers`; completeness is the lifecycle
/// controller's responsibility.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub applicant_id: UserId,
    pub contact_channel_id: ContactChannelId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub answers: BTreeMap<String, String>,
}

/// Storage abstraction over the applications table so the lifecycle controller
/// can be exercised in isolation.
///
/// Implementations serialize every operation through a single exclusive
/// critical section; callers never observe partial writes.
pub trait ApplicationStore: Send + Sync {
    /// Inserts with `status = pending` and returns the stored record.
    fn create(&self, submission: NewApplication) -> Result<Application, StorageError>;
    fn get(&self, id: ApplicationId) -> Result<Option<Application>, StorageError>;
    /// Pending applications, oldest first, bounded by `limit`.
    fn list_pending(&self, limit: usize) -> Result<Vec<Application>, StorageError>;
    /// Every application for one applicant, newest first.
    fn list_by_applicant(&self, applicant: UserId) -> Result<Vec<Application>, StorageError>;
    fn latest_for_applicant(&self, applicant: UserId) -> Result<Option<Application>, StorageError>;
    /// Every application, oldest first. Feeds the export and backlog re-sync paths.
    fn list_all(&self) -> Result<Vec<Application>, StorageError>;
    /// Sets status and comment and refreshes `updated_at`. No transition-legality
    /// check at this layer; the store is a dumb persistence layer.
    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        comment: Option<String>,
    ) -> Result<(), StorageError>;
    /// Flips `synced` to true and refreshes `updated_at`.
    fn mark_synced(&self, id: ApplicationId) -> Result<(), StorageError>;
}

/// Error enumeration for record store failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("application #{0} not found")]
    NotFound(ApplicationId),
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
