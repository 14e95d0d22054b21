use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::domain::{ApplicantIdentity, ApplicationId, StatusReport, UserId};
use super::lifecycle::{LifecycleController, LifecycleError, SubmissionGate};
use super::notify::Notifier;
use super::repository::{ApplicationStore, NewApplication};
use super::survey::{is_cancel_text, QuestionPrompt, SessionProgress, SurveySession};
use super::sync::KnowledgeBaseSync;

/// Why a submission attempt was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedReason {
    AlreadyPending {
        application_id: ApplicationId,
    },
    AlreadyApproved {
        application_id: ApplicationId,
        invite: Option<String>,
    },
}

impl BlockedReason {
    pub fn message(&self) -> String {
        match self {
            BlockedReason::AlreadyPending { .. } => {
                "Your application is still under review. Please wait for a decision.".to_string()
            }
            BlockedReason::AlreadyApproved { invite, .. } => match invite {
                Some(link) => format!(
                    "Your previous application was already approved. Here is the current link:\n{link}"
                ),
                None => "Your previous application was already approved. The invite link was already sent.".to_string(),
            },
        }
    }

    fn from_gate(gate: SubmissionGate) -> Option<Self> {
        match gate {
            SubmissionGate::Open => None,
            SubmissionGate::AlreadyPending { application_id } => {
                Some(BlockedReason::AlreadyPending { application_id })
            }
            SubmissionGate::AlreadyApproved {
                application_id,
                invite,
            } => Some(BlockedReason::AlreadyApproved {
                application_id,
                invite,
            }),
        }
    }
}

/// Outcome of `begin`: either the first question or a blocked notice.
#[derive(Debug)]
pub enum BeginOutcome {
    Question(QuestionPrompt),
    Blocked(BlockedReason),
}

/// Outcome of feeding one answer into the exchange.
#[derive(Debug)]
pub enum AnswerOutcome {
    /// Ask this question next.
    Question(QuestionPrompt),
    /// The supplied index was stale; re-ask the current question without
    /// consuming the answer.
    Repeat(QuestionPrompt),
    /// Survey complete; a pending application was created.
    Completed { application_id: ApplicationId },
    /// The applicant cancelled; partial answers were discarded.
    Cancelled,
    /// No survey in progress for this applicant.
    NotInProgress,
    /// The gate closed between begin and completion; nothing was persisted.
    Blocked(BlockedReason),
}

/// Conversational front-end boundary: drives one survey session per applicant
/// and hands completed answer sets to the lifecycle controller.
pub struct IntakeCoordinator<S, K, N> {
    lifecycle: Arc<LifecycleController<S, K, N>>,
    sessions: Mutex<HashMap<UserId, SurveySession>>,
}

impl<S, K, N> IntakeCoordinator<S, K, N>
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    pub fn new(lifecycle: Arc<LifecycleController<S, K, N>>) -> Self {
        Self {
            lifecycle,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleController<S, K, N>> {
        &self.lifecycle
    }

    /// Starts (or restarts) the survey for an applicant. Re-entry while a
    /// session is open resets it to the first question.
    pub fn begin(&self, identity: ApplicantIdentity) -> Result<BeginOutcome, LifecycleError> {
        let applicant = identity.applicant_id;
        if let Some(reason) = BlockedReason::from_gate(self.lifecycle.submission_gate(applicant)?) {
            return Ok(BeginOutcome::Blocked(reason));
        }

        let session = SurveySession::start(identity);
        let prompt = self
            .lifecycle
            .survey()
            .prompt_at(session.question_index())
            .expect("survey has at least one question");

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(applicant, session);
        info!(applicant = %applicant, "survey started");
        Ok(BeginOutcome::Question(prompt))
    }

    /// Feeds one free-text answer into the applicant's session.
    ///
    /// `question_index` guards against stale or replayed transport messages: a
    /// mismatch re-prompts the current question instead of recording the text.
    pub fn answer(
        &self,
        applicant: UserId,
        question_index: usize,
        text: &str,
    ) -> Result<AnswerOutcome, LifecycleError> {
        if is_cancel_text(text) {
            return Ok(self.cancel(applicant));
        }

        let session = {
            let mut sessions = self.sessions.lock().expect("session mutex poisoned");
            match sessions.remove(&applicant) {
                Some(session) => session,
                None => return Ok(AnswerOutcome::NotInProgress),
            }
        };

        if session.question_index() != question_index {
            let prompt = self
                .lifecycle
                .survey()
                .prompt_at(session.question_index())
                .expect("session index always points at a question");
            self.restore(applicant, session);
            return Ok(AnswerOutcome::Repeat(prompt));
        }

        match session.record_answer(self.lifecycle.survey(), text.trim().to_string()) {
            SessionProgress::Next(session) => {
                let prompt = self
                    .lifecycle
                    .survey()
                    .prompt_at(session.question_index())
                    .expect("session index always points at a question");
                self.restore(applicant, session);
                Ok(AnswerOutcome::Question(prompt))
            }
            SessionProgress::Complete { identity, answers } => {
                let submission = NewApplication {
                    applicant_id: identity.applicant_id,
                    contact_channel_id: identity.contact_channel_id,
                    username: identity.username,
                    display_name: identity.display_name,
                    answers,
                };
                match self.lifecycle.record_submission(submission) {
                    Ok(application) => Ok(AnswerOutcome::Completed {
                        application_id: application.id,
                    }),
                    Err(LifecycleError::DuplicatePending { id, .. }) => Ok(AnswerOutcome::Blocked(
                        BlockedReason::AlreadyPending { application_id: id },
                    )),
                    Err(LifecycleError::AlreadyMember { id, .. }) => {
                        Ok(AnswerOutcome::Blocked(BlockedReason::AlreadyApproved {
                            application_id: id,
                            invite: None,
                        }))
                    }
                    Err(other) => Err(other),
                }
            }
        }
    }

    /// Aborts any in-flight session, discarding partial answers.
    pub fn cancel(&self, applicant: UserId) -> AnswerOutcome {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        if sessions.remove(&applicant).is_some() {
            info!(applicant = %applicant, "survey cancelled");
            AnswerOutcome::Cancelled
        } else {
            AnswerOutcome::NotInProgress
        }
    }

    /// Latest persisted status for the applicant, if any.
    pub fn status(&self, applicant: UserId) -> Result<Option<StatusReport>, LifecycleError> {
        self.lifecycle.applicant_status(applicant)
    }

    fn restore(&self, applicant: UserId, session: SurveySession) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(applicant, session);
    }
}
