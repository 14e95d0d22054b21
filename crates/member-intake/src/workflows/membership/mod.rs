//! Membership application intake workflow.
//!
//! Applicants answer a fixed survey over a conversational exchange; completed
//! submissions become pending applications in the record store. Administrators
//! approve or decline; approvals push one row to an external knowledge base and
//! track the outcome idempotently via the `synced` flag.

pub mod domain;
pub mod export;
pub mod intake;
pub mod json_store;
pub mod lifecycle;
pub mod notify;
pub mod repository;
pub mod router;
pub mod survey;
pub mod sync;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantIdentity, Application, ApplicationId, ApplicationStatus, ApplicationSummary,
    ContactChannelId, HistoryEntry, StatusReport, UserId,
};
pub use intake::{AnswerOutcome, BeginOutcome, BlockedReason, IntakeCoordinator};
pub use json_store::JsonFileStore;
pub use lifecycle::{
    AdminRoster, BacklogReport, DecisionAction, DecisionOutcome, LifecycleController,
    LifecycleError, PendingReview, SubmissionGate, SyncDisposition,
};
pub use notify::{LogNotifier, NotificationError, Notifier};
pub use repository::{ApplicationStore, NewApplication, StorageError};
pub use router::membership_router;
pub use survey::{QuestionPrompt, SurveyDefinition, SurveyQuestion, CANCEL_KEYWORDS};
pub use sync::{FieldMapping, HttpKnowledgeBase, KnowledgeBaseSync, SyncRow};
