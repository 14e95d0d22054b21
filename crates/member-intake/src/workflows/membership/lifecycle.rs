use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSummary, HistoryEntry, StatusReport,
    UserId,
};
use super::notify::Notifier;
use super::repository::{ApplicationStore, NewApplication, StorageError};
use super::survey::SurveyDefinition;
use super::sync::{KnowledgeBaseSync, SyncRow};

const APPROVE_FALLBACK_INVITE: &str = "The invite link will be sent separately.";

/// The set of users allowed to approve or decline applications.
#[derive(Debug, Clone, Default)]
pub struct AdminRoster {
    members: HashSet<UserId>,
}

impl AdminRoster {
    pub fn new(members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }
}

/// Admin decision on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Decline,
}

/// How the knowledge-base push went as part of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDisposition {
    /// Push confirmed; `synced` persisted as true.
    Synced,
    /// Push failed; approval stands, retriable via the backlog command.
    Failed,
    /// The record was approved and synced before this call; no push attempted.
    AlreadySynced,
    /// Declines never sync.
    NotAttempted,
}

/// Exactly one terminal response per admin decision, even when secondary
/// effects degraded.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub sync: SyncDisposition,
    pub notified: bool,
}

impl DecisionOutcome {
    pub fn summary(&self) -> String {
        let mut text = format!("application #{} {}", self.application_id, self.status);
        match self.sync {
            SyncDisposition::Synced => text.push_str("; knowledge base sync succeeded"),
            SyncDisposition::Failed => {
                text.push_str("; knowledge base sync failed, retry with sync-backlog")
            }
            SyncDisposition::AlreadySynced => text.push_str("; already synced"),
            SyncDisposition::NotAttempted => {}
        }
        if self.notified {
            text.push_str("; applicant notified");
        }
        text
    }
}

/// Whether an applicant may start a fresh submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionGate {
    Open,
    /// A pending application already exists; block re-entry into the survey.
    AlreadyPending { application_id: ApplicationId },
    /// The latest application was approved; report the cached invite instead of
    /// re-surveying.
    AlreadyApproved {
        application_id: ApplicationId,
        invite: Option<String>,
    },
}

/// A pending application paired with the applicant's submission history,
/// as shown in the admin review queue.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReview {
    pub application: ApplicationSummary,
    pub history: Vec<HistoryEntry>,
}

/// Result of the out-of-band backlog re-sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BacklogReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Error raised by the lifecycle controller.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("user {0} is not an administrator")]
    Unauthorized(UserId),
    #[error("application #{id} was already processed ({status})")]
    AlreadyProcessed {
        id: ApplicationId,
        status: &'static str,
    },
    #[error("application #{0} not found")]
    UnknownApplication(ApplicationId),
    #[error("submission is missing answers for: {}", missing.join(", "))]
    IncompleteSubmission { missing: Vec<String> },
    #[error("applicant {applicant} already has pending application #{id}")]
    DuplicatePending { applicant: UserId, id: ApplicationId },
    #[error("applicant {applicant} was already approved with application #{id}")]
    AlreadyMember { applicant: UserId, id: ApplicationId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The application lifecycle state machine: validates transitions, orchestrates
/// store, sync, and notification calls, and decides idempotency.
pub struct LifecycleController<S, K, N> {
    store: Arc<S>,
    knowledge_base: Arc<K>,
    notifier: Arc<N>,
    admins: AdminRoster,
    survey: SurveyDefinition,
    invite_link: Option<String>,
}

impl<S, K, N> LifecycleController<S, K, N>
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        knowledge_base: Arc<K>,
        notifier: Arc<N>,
        admins: AdminRoster,
        survey: SurveyDefinition,
        invite_link: Option<String>,
    ) -> Self {
        Self {
            store,
            knowledge_base,
            notifier,
            admins,
            survey,
            invite_link,
        }
    }

    pub fn survey(&self) -> &SurveyDefinition {
        &self.survey
    }

    /// Checks whether `applicant` may begin a fresh submission. A declined
    /// history, or no history at all, leaves the gate open; re-submission
    /// always creates a new record.
    pub fn submission_gate(&self, applicant: UserId) -> Result<SubmissionGate, LifecycleError> {
        match self.store.latest_for_applicant(applicant)? {
            Some(latest) => Ok(match latest.status {
                ApplicationStatus::Pending => SubmissionGate::AlreadyPending {
                    application_id: latest.id,
                },
                ApplicationStatus::Approved => SubmissionGate::AlreadyApproved {
                    application_id: latest.id,
                    invite: self.invite_link.clone(),
                },
                ApplicationStatus::Declined => SubmissionGate::Open,
            }),
            None => Ok(SubmissionGate::Open),
        }
    }

    /// Persists a completed survey as a new pending application.
    ///
    /// Enforces the single-pending invariant and survey completeness; partial
    /// answer sets never reach the store.
    pub fn record_submission(
        &self,
        mut submission: NewApplication,
    ) -> Result<Application, LifecycleError> {
        let missing: Vec<String> = self
            .survey
            .keys()
            .filter(|key| !submission.answers.contains_key(*key))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(LifecycleError::IncompleteSubmission { missing });
        }

        match self.submission_gate(submission.applicant_id)? {
            SubmissionGate::Open => {}
            SubmissionGate::AlreadyPending { application_id } => {
                return Err(LifecycleError::DuplicatePending {
                    applicant: submission.applicant_id,
                    id: application_id,
                });
            }
            SubmissionGate::AlreadyApproved { application_id, .. } => {
                return Err(LifecycleError::AlreadyMember {
                    applicant: submission.applicant_id,
                    id: application_id,
                });
            }
        }

        // The answered name wins over the transport-provided one.
        if let Some(full_name) = submission.answers.get("full_name") {
            submission.display_name = Some(full_name.clone());
        }

        let application = self.store.create(submission)?;
        info!(
            application = %application.id,
            applicant = %application.applicant_id,
            "application recorded"
        );
        Ok(application)
    }

    /// The pending queue for admin review, oldest first, with per-applicant
    /// submission history attached.
    pub fn pending_queue(
        &self,
        actor: UserId,
        limit: usize,
    ) -> Result<Vec<PendingReview>, LifecycleError> {
        if !self.admins.contains(actor) {
            return Err(LifecycleError::Unauthorized(actor));
        }

        let mut queue = Vec::new();
        for application in self.store.list_pending(limit)? {
            let history = self
                .store
                .list_by_applicant(application.applicant_id)?
                .iter()
                .map(Application::history_entry)
                .collect();
            queue.push(PendingReview {
                application: application.summary(),
                history,
            });
        }
        Ok(queue)
    }

    /// Admin-initiated transition out of `pending`. Approved and declined are
    /// terminal; a repeated approve on an already-synced record short-circuits
    /// idempotently instead of erroring.
    pub fn decide(
        &self,
        actor: UserId,
        id: ApplicationId,
        action: DecisionAction,
        comment: Option<String>,
    ) -> Result<DecisionOutcome, LifecycleError> {
        if !self.admins.contains(actor) {
            return Err(LifecycleError::Unauthorized(actor));
        }

        let application = self
            .store
            .get(id)?
            .ok_or(LifecycleError::UnknownApplication(id))?;

        match application.status {
            ApplicationStatus::Pending => {}
            ApplicationStatus::Approved
                if action == DecisionAction::Approve && application.synced =>
            {
                return Ok(DecisionOutcome {
                    application_id: id,
                    status: ApplicationStatus::Approved.label(),
                    sync: SyncDisposition::AlreadySynced,
                    notified: false,
                });
            }
            other => {
                return Err(LifecycleError::AlreadyProcessed {
                    id,
                    status: other.label(),
                });
            }
        }

        match action {
            DecisionAction::Approve => self.approve(application, comment),
            DecisionAction::Decline => self.decline(application, comment),
        }
    }

    fn approve(
        &self,
        application: Application,
        comment: Option<String>,
    ) -> Result<DecisionOutcome, LifecycleError> {
        self.store
            .update_status(application.id, ApplicationStatus::Approved, comment)?;

        // Approval and sync are decoupled: a failed push degrades the response
        // but never reverts the transition.
        let sync = if self.knowledge_base.push(&sync_row(&application)) {
            self.store.mark_synced(application.id)?;
            SyncDisposition::Synced
        } else {
            SyncDisposition::Failed
        };

        let invite = self
            .invite_link
            .as_deref()
            .unwrap_or(APPROVE_FALLBACK_INVITE);
        let text = format!(
            "Hi, {}! Your application has been approved 🎉\nHere is your invite link: {}\nSee you inside!",
            application.addressed_name(),
            invite
        );
        let notified = self.notify(&application, &text);

        info!(
            application = %application.id,
            applicant = %application.applicant_id,
            ?sync,
            "application approved"
        );
        Ok(DecisionOutcome {
            application_id: application.id,
            status: ApplicationStatus::Approved.label(),
            sync,
            notified,
        })
    }

    fn decline(
        &self,
        application: Application,
        comment: Option<String>,
    ) -> Result<DecisionOutcome, LifecycleError> {
        self.store
            .update_status(application.id, ApplicationStatus::Declined, comment)?;

        let text = format!(
            "Hi, {}! Thanks for your interest, but we cannot accept your application right now. You are welcome to apply again later.",
            application.addressed_name()
        );
        let notified = self.notify(&application, &text);

        info!(
            application = %application.id,
            applicant = %application.applicant_id,
            "application declined"
        );
        Ok(DecisionOutcome {
            application_id: application.id,
            status: ApplicationStatus::Declined.label(),
            sync: SyncDisposition::NotAttempted,
            notified,
        })
    }

    fn notify(&self, application: &Application, text: &str) -> bool {
        match self.notifier.send(application.contact_channel_id, text) {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    application = %application.id,
                    channel = application.contact_channel_id.0,
                    %error,
                    "applicant notification failed"
                );
                false
            }
        }
    }

    /// Latest status for the `applicant_status` operation.
    pub fn applicant_status(&self, applicant: UserId) -> Result<Option<StatusReport>, LifecycleError> {
        Ok(self
            .store
            .latest_for_applicant(applicant)?
            .map(|application| StatusReport {
                application_id: application.id,
                status: application.status.label(),
                submitted_at: application.created_at,
            }))
    }

    pub fn applicant_history(&self, applicant: UserId) -> Result<Vec<HistoryEntry>, LifecycleError> {
        Ok(self
            .store
            .list_by_applicant(applicant)?
            .iter()
            .map(Application::history_entry)
            .collect())
    }

    /// Re-pushes every approved-but-unsynced application, marking records
    /// synced on confirmed success only. Failures are logged and counted;
    /// the scan continues.
    pub fn sync_backlog(&self) -> Result<BacklogReport, LifecycleError> {
        let mut report = BacklogReport::default();
        for application in self.store.list_all()? {
            if application.status != ApplicationStatus::Approved || application.synced {
                continue;
            }
            report.attempted += 1;
            if self.knowledge_base.push(&sync_row(&application)) {
                self.store.mark_synced(application.id)?;
                report.synced += 1;
                info!(application = %application.id, "backlog sync succeeded");
            } else {
                report.failed += 1;
                warn!(application = %application.id, "backlog sync failed");
            }
        }
        Ok(report)
    }
}

/// Builds the logical sync row for one application: applicant id plus every
/// survey answer under its logical key.
fn sync_row(application: &Application) -> SyncRow {
    let mut fields: BTreeMap<String, String> = application.answers.clone();
    fields.insert(
        "applicant_id".to_string(),
        application.applicant_id.to_string(),
    );

    SyncRow {
        title: application.addressed_name().to_string(),
        fields,
    }
}
