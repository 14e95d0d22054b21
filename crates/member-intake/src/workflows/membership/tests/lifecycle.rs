use super::common::*;
use crate::workflows::membership::domain::ApplicationStatus;
use crate::workflows::membership::lifecycle::{DecisionAction, LifecycleError, SyncDisposition};
use crate::workflows::membership::repository::ApplicationStore;

#[test]
fn approve_persists_syncs_and_notifies() {
    let (controller, store, sync, notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    let outcome = controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("approve succeeds");

    assert_eq!(outcome.status, "approved");
    assert_eq!(outcome.sync, SyncDisposition::Synced);
    assert!(outcome.notified);
    assert_eq!(sync.calls(), 1);

    let stored = store
        .get(application.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    assert!(stored.synced);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, application.contact_channel_id);
    assert!(messages[0].1.contains("approved"));
    assert!(messages[0].1.contains(INVITE));
}

#[test]
fn repeated_approve_short_circuits_without_second_push() {
    let (controller, _store, sync, notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("first approve succeeds");
    let second = controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("second approve is idempotent");

    assert_eq!(second.sync, SyncDisposition::AlreadySynced);
    assert!(!second.notified);
    assert_eq!(sync.calls(), 1);
    assert_eq!(notifier.messages().len(), 1);
    assert!(second.summary().contains("already synced"));
}

#[test]
fn non_admin_decision_is_rejected() {
    let (controller, store, sync, _notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    match controller.decide(NON_ADMIN, application.id, DecisionAction::Approve, None) {
        Err(LifecycleError::Unauthorized(user)) => assert_eq!(user, NON_ADMIN),
        other => panic!("expected authorization error, got {other:?}"),
    }

    let stored = store
        .get(application.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert_eq!(sync.calls(), 0);
}

#[test]
fn decline_notifies_without_sync() {
    let (controller, store, sync, notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    let outcome = controller
        .decide(
            ADMIN,
            application.id,
            DecisionAction::Decline,
            Some("not a fit right now".to_string()),
        )
        .expect("decline succeeds");

    assert_eq!(outcome.status, "declined");
    assert_eq!(outcome.sync, SyncDisposition::NotAttempted);
    assert_eq!(sync.calls(), 0);

    let stored = store
        .get(application.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Declined);
    assert!(!stored.synced);
    assert_eq!(
        stored.admin_comment.as_deref(),
        Some("not a fit right now")
    );

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("cannot accept"));
}

#[test]
fn sync_failure_degrades_but_keeps_approval() {
    let (controller, store, sync, _notifier) = build_controller();
    sync.set_outcome(false);
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    let outcome = controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("approve still succeeds");

    assert_eq!(outcome.status, "approved");
    assert_eq!(outcome.sync, SyncDisposition::Failed);
    assert!(outcome.summary().contains("sync failed"));

    let stored = store
        .get(application.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    assert!(!stored.synced, "synced only flips on confirmed push");
}

#[test]
fn backlog_resync_pushes_only_approved_unsynced() {
    let (controller, store, sync, _notifier) = build_controller();
    sync.set_outcome(false);

    let failed = controller
        .record_submission(submission(10))
        .expect("submission recorded");
    controller
        .decide(ADMIN, failed.id, DecisionAction::Approve, None)
        .expect("approve with failed sync");

    let declined = controller
        .record_submission(submission(20))
        .expect("submission recorded");
    controller
        .decide(ADMIN, declined.id, DecisionAction::Decline, None)
        .expect("decline succeeds");

    let still_pending = controller
        .record_submission(submission(30))
        .expect("submission recorded");

    sync.set_outcome(true);
    let calls_before = sync.calls();
    let report = controller.sync_backlog().expect("backlog scan succeeds");

    assert_eq!(report.attempted, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(sync.calls(), calls_before + 1);

    let resynced = store
        .get(failed.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(resynced.synced);
    let untouched = store
        .get(still_pending.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(!untouched.synced);
}

#[test]
fn notification_failure_never_blocks_the_transition() {
    let (controller, store, _sync, notifier) = build_controller();
    notifier.set_failing(true);
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");

    let outcome = controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("approve succeeds despite notify failure");

    assert!(!outcome.notified);
    let stored = store
        .get(application.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
}

#[test]
fn terminal_states_reject_further_decisions() {
    let (controller, _store, _sync, _notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");
    controller
        .decide(ADMIN, application.id, DecisionAction::Decline, None)
        .expect("decline succeeds");

    for action in [DecisionAction::Approve, DecisionAction::Decline] {
        match controller.decide(ADMIN, application.id, action, None) {
            Err(LifecycleError::AlreadyProcessed { status, .. }) => {
                assert_eq!(status, "declined")
            }
            other => panic!("expected already-processed error, got {other:?}"),
        }
    }
}

#[test]
fn unknown_application_is_reported() {
    let (controller, _store, _sync, _notifier) = build_controller();
    match controller.decide(
        ADMIN,
        crate::workflows::membership::ApplicationId(999),
        DecisionAction::Approve,
        None,
    ) {
        Err(LifecycleError::UnknownApplication(id)) => assert_eq!(id.0, 999),
        other => panic!("expected unknown application error, got {other:?}"),
    }
}

#[test]
fn partial_answer_sets_never_persist() {
    let (controller, store, _sync, _notifier) = build_controller();
    let mut incomplete = submission(10);
    incomplete.answers.remove("goals");

    match controller.record_submission(incomplete) {
        Err(LifecycleError::IncompleteSubmission { missing }) => {
            assert_eq!(missing, vec!["goals".to_string()])
        }
        other => panic!("expected incomplete submission error, got {other:?}"),
    }
    assert!(store.list_all().expect("list succeeds").is_empty());
}

#[test]
fn one_pending_application_per_applicant() {
    let (controller, store, _sync, _notifier) = build_controller();
    controller
        .record_submission(submission(10))
        .expect("first submission recorded");

    match controller.record_submission(submission(10)) {
        Err(LifecycleError::DuplicatePending { applicant, .. }) => {
            assert_eq!(applicant.0, 10)
        }
        other => panic!("expected duplicate pending error, got {other:?}"),
    }

    let history = store
        .list_by_applicant(crate::workflows::membership::UserId(10))
        .expect("history loads");
    let pending = history
        .iter()
        .filter(|application| application.status == ApplicationStatus::Pending)
        .count();
    assert_eq!(pending, 1);
}

#[test]
fn resubmission_after_decline_creates_a_new_record() {
    let (controller, store, _sync, _notifier) = build_controller();
    let first = controller
        .record_submission(submission(10))
        .expect("first submission recorded");
    controller
        .decide(ADMIN, first.id, DecisionAction::Decline, None)
        .expect("decline succeeds");

    let second = controller
        .record_submission(submission(10))
        .expect("resubmission allowed after decline");
    assert_ne!(first.id, second.id);

    let history = store
        .list_by_applicant(first.applicant_id)
        .expect("history loads");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id, "newest first");
}

#[test]
fn pending_queue_is_admin_only_and_oldest_first() {
    let (controller, _store, _sync, _notifier) = build_controller();
    let first = controller
        .record_submission(submission(10))
        .expect("submission recorded");
    let second = controller
        .record_submission(submission(20))
        .expect("submission recorded");

    match controller.pending_queue(NON_ADMIN, 10) {
        Err(LifecycleError::Unauthorized(_)) => {}
        other => panic!("expected authorization error, got {other:?}"),
    }

    let queue = controller
        .pending_queue(ADMIN, 10)
        .expect("queue loads for admin");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].application.id, first.id);
    assert_eq!(queue[1].application.id, second.id);
    assert_eq!(queue[0].history.len(), 1);

    let limited = controller
        .pending_queue(ADMIN, 1)
        .expect("limited queue loads");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].application.id, first.id);
}

#[test]
fn answered_name_wins_over_transport_name() {
    let (controller, _store, sync, _notifier) = build_controller();
    let application = controller
        .record_submission(submission(10))
        .expect("submission recorded");
    assert_eq!(application.display_name.as_deref(), Some("Ada Lovelace"));

    controller
        .decide(ADMIN, application.id, DecisionAction::Approve, None)
        .expect("approve succeeds");
    let rows = sync.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Ada Lovelace");
    assert_eq!(
        rows[0].fields.get("applicant_id").map(String::as_str),
        Some("10")
    );
    assert_eq!(rows[0].fields.get("age").map(String::as_str), Some("36"));
}
