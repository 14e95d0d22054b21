use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ApplicantIdentity, ApplicationId, UserId};
use super::intake::{AnswerOutcome, BeginOutcome, IntakeCoordinator};
use super::lifecycle::{DecisionAction, LifecycleError};
use super::notify::Notifier;
use super::repository::ApplicationStore;
use super::survey::QuestionPrompt;
use super::sync::KnowledgeBaseSync;

/// Review batch size for the admin queue; keeps one screenful per request.
const PENDING_QUEUE_LIMIT: usize = 10;

/// Router builder exposing the intake and admin review endpoints.
pub fn membership_router<S, K, N>(coordinator: Arc<IntakeCoordinator<S, K, N>>) -> Router
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/intake/begin", post(begin_handler::<S, K, N>))
        .route("/api/v1/intake/answer", post(answer_handler::<S, K, N>))
        .route(
            "/api/v1/intake/:applicant_id/status",
            get(status_handler::<S, K, N>),
        )
        .route(
            "/api/v1/admin/:admin_id/applications",
            get(pending_handler::<S, K, N>),
        )
        .route(
            "/api/v1/admin/:admin_id/applications/:application_id/decision",
            post(decision_handler::<S, K, N>),
        )
        .with_state(coordinator)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) applicant_id: UserId,
    pub(crate) question_index: usize,
    pub(crate) text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) action: DecisionAction,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

pub(crate) async fn begin_handler<S, K, N>(
    State(coordinator): State<Arc<IntakeCoordinator<S, K, N>>>,
    axum::Json(identity): axum::Json<ApplicantIdentity>,
) -> Response
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    match coordinator.begin(identity) {
        Ok(BeginOutcome::Question(prompt)) => question_response("question", prompt),
        Ok(BeginOutcome::Blocked(reason)) => {
            let payload = json!({
                "outcome": "blocked",
                "message": reason.message(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => lifecycle_error_response(error),
    }
}

pub(crate) async fn answer_handler<S, K, N>(
    State(coordinator): State<Arc<IntakeCoordinator<S, K, N>>>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    match coordinator.answer(request.applicant_id, request.question_index, &request.text) {
        Ok(AnswerOutcome::Question(prompt)) => question_response("question", prompt),
        Ok(AnswerOutcome::Repeat(prompt)) => question_response("repeat", prompt),
        Ok(AnswerOutcome::Completed { application_id }) => {
            let payload = json!({
                "outcome": "completed",
                "application_id": application_id,
                "message": "Thank you! Your application was received. An administrator will contact you after review.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(AnswerOutcome::Cancelled) => {
            let payload = json!({
                "outcome": "cancelled",
                "message": "Survey stopped. You can start again at any time.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(AnswerOutcome::NotInProgress) => {
            let payload = json!({
                "outcome": "not_in_progress",
                "message": "No survey in progress. Begin a submission first.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(AnswerOutcome::Blocked(reason)) => {
            let payload = json!({
                "outcome": "blocked",
                "message": reason.message(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => lifecycle_error_response(error),
    }
}

pub(crate) async fn status_handler<S, K, N>(
    State(coordinator): State<Arc<IntakeCoordinator<S, K, N>>>,
    Path(applicant_id): Path<i64>,
) -> Response
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    match coordinator.status(UserId(applicant_id)) {
        Ok(Some(report)) => (StatusCode::OK, axum::Json(report)).into_response(),
        Ok(None) => {
            let payload = json!({
                "status": "none",
                "message": "No applications found. Begin a submission to apply.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => lifecycle_error_response(error),
    }
}

pub(crate) async fn pending_handler<S, K, N>(
    State(coordinator): State<Arc<IntakeCoordinator<S, K, N>>>,
    Path(admin_id): Path<i64>,
) -> Response
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    match coordinator
        .lifecycle()
        .pending_queue(UserId(admin_id), PENDING_QUEUE_LIMIT)
    {
        Ok(queue) => (StatusCode::OK, axum::Json(queue)).into_response(),
        Err(error) => lifecycle_error_response(error),
    }
}

pub(crate) async fn decision_handler<S, K, N>(
    State(coordinator): State<Arc<IntakeCoordinator<S, K, N>>>,
    Path((admin_id, application_id)): Path<(i64, u64)>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    K: KnowledgeBaseSync + 'static,
    N: Notifier + 'static,
{
    // The knowledge-base push is a blocking HTTP call; keep it off the runtime.
    let controller = coordinator.lifecycle().clone();
    let outcome = tokio::task::spawn_blocking(move || {
        controller.decide(
            UserId(admin_id),
            ApplicationId(application_id),
            request.action,
            request.comment,
        )
    })
    .await;

    match outcome {
        Ok(Ok(decision)) => {
            let payload = json!({
                "application_id": decision.application_id,
                "status": decision.status,
                "sync": decision.sync,
                "notified": decision.notified,
                "summary": decision.summary(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => lifecycle_error_response(error),
        Err(join_error) => {
            error!(%join_error, "decision task failed");
            internal_error_response()
        }
    }
}

fn question_response(outcome: &str, prompt: QuestionPrompt) -> Response {
    let payload = json!({
        "outcome": outcome,
        "question": prompt,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn lifecycle_error_response(error: LifecycleError) -> Response {
    let status = match &error {
        LifecycleError::Unauthorized(_) => StatusCode::FORBIDDEN,
        LifecycleError::AlreadyProcessed { .. }
        | LifecycleError::DuplicatePending { .. }
        | LifecycleError::AlreadyMember { .. }
        | LifecycleError::IncompleteSubmission { .. } => StatusCode::CONFLICT,
        LifecycleError::UnknownApplication(_) => StatusCode::NOT_FOUND,
        LifecycleError::Storage(storage) => {
            // Full detail stays in the logs; the actor sees a generic failure.
            error!(%storage, "record store failure");
            return internal_error_response();
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn internal_error_response() -> Response {
    let payload = json!({ "error": "internal storage failure" });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
