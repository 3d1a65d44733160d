/// Unit tests for the dispute state machine.
/// All transitions are pure functions, so no database is involved.
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use credit_bureau_api::disputes::{
    admin_resolve, consumer_cancel, consumer_update, lender_respond, new_dispute, ConsumerUpdate,
    ResolutionOutcome,
};
use credit_bureau_api::errors::AppError;
use credit_bureau_api::models::{
    AffectedItem, Dispute, DisputeAction, DisputeReason, DisputeStatus,
};

fn fixed_now() -> DateTime<Utc> {
    "2026-06-01T12:00:00Z".parse().unwrap()
}

fn item(field: &str) -> AffectedItem {
    AffectedItem {
        field: field.to_string(),
        current_value: serde_json::json!("wrong"),
        claimed_value: serde_json::json!("right"),
        resolved: false,
    }
}

fn open_dispute(items: Vec<AffectedItem>) -> Dispute {
    new_dispute(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        DisputeReason::IncorrectAmount,
        "The balance reported here is wrong".to_string(),
        vec![],
        items,
        fixed_now(),
    )
    .unwrap()
}

fn assert_conflict(result: Result<impl std::fmt::Debug, AppError>, fragments: &[&str]) {
    match result {
        Err(AppError::Conflict(msg)) => {
            for fragment in fragments {
                assert!(msg.contains(fragment), "message '{}' missing '{}'", msg, fragment);
            }
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[test]
fn new_dispute_starts_pending_with_created_event() {
    let dispute = open_dispute(vec![item("current_balance")]);
    assert_eq!(dispute.status, DisputeStatus::Pending);
    assert_eq!(dispute.history.len(), 1);
    assert_eq!(dispute.history[0].action, DisputeAction::Created);
    assert!(dispute.lender_response.is_none());
    assert!(dispute.resolved_at.is_none());
    assert_eq!(dispute.progress_percentage(), 0);
}

#[test]
fn short_description_is_rejected() {
    let result = new_dispute(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        DisputeReason::Other,
        "too short".to_string(),
        vec![],
        vec![],
        fixed_now(),
    );
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn respond_moves_pending_to_investigating() {
    let mut dispute = open_dispute(vec![]);
    let lender = dispute.lender_id;
    lender_respond(
        &mut dispute,
        lender,
        "We are reviewing the account".to_string(),
        fixed_now() + Duration::days(1),
    )
    .unwrap();

    assert_eq!(dispute.status, DisputeStatus::Investigating);
    assert_eq!(
        dispute.lender_response.as_deref(),
        Some("We are reviewing the account")
    );
    assert_eq!(dispute.history.last().unwrap().action, DisputeAction::Responded);
    assert_eq!(dispute.progress_percentage(), 50);
}

#[test]
fn cancel_only_from_pending() {
    let mut dispute = open_dispute(vec![]);
    let consumer = dispute.initiated_by;
    consumer_cancel(&mut dispute, consumer, fixed_now()).unwrap();
    assert_eq!(dispute.status, DisputeStatus::Canceled);
    assert!(dispute.resolved_at.is_some());

    let mut investigating = open_dispute(vec![]);
    let lender = investigating.lender_id;
    let consumer = investigating.initiated_by;
    lender_respond(&mut investigating, lender, "Looking".to_string(), fixed_now()).unwrap();
    assert_conflict(
        consumer_cancel(&mut investigating, consumer, fixed_now()),
        &["cancel", "investigating"],
    );
}

#[test]
fn terminal_disputes_reject_every_transition() {
    let mut dispute = open_dispute(vec![item("status")]);
    admin_resolve(
        &mut dispute,
        Uuid::new_v4(),
        ResolutionOutcome::Resolved,
        "Corrected per court documents".to_string(),
        fixed_now(),
    )
    .unwrap();
    assert_eq!(dispute.status, DisputeStatus::Resolved);

    let lender = dispute.lender_id;
    let consumer = dispute.initiated_by;
    assert_conflict(
        lender_respond(&mut dispute, lender, "Late reply".to_string(), fixed_now()),
        &["respond", "resolved"],
    );
    assert_conflict(
        consumer_update(&mut dispute, consumer, ConsumerUpdate::default(), fixed_now()),
        &["update", "resolved"],
    );
    assert_conflict(
        admin_resolve(
            &mut dispute,
            Uuid::new_v4(),
            ResolutionOutcome::Rejected,
            "Second opinion".to_string(),
            fixed_now(),
        ),
        &["resolve", "resolved"],
    );
}

#[test]
fn favorable_resolution_marks_items_and_requests_recalc() {
    let mut dispute = open_dispute(vec![item("current_balance"), item("status")]);
    let recalc_due = admin_resolve(
        &mut dispute,
        Uuid::new_v4(),
        ResolutionOutcome::Resolved,
        "Lender confirmed the error".to_string(),
        fixed_now() + Duration::days(3),
    )
    .unwrap();

    assert!(recalc_due);
    assert_eq!(dispute.resolved_items_count(), 2);
    assert_eq!(dispute.resolution.as_deref(), Some("Lender confirmed the error"));
    assert_eq!(dispute.resolved_at, Some(fixed_now() + Duration::days(3)));
    assert_eq!(dispute.progress_percentage(), 100);
}

#[test]
fn rejection_leaves_items_unresolved_and_skips_recalc() {
    let mut dispute = open_dispute(vec![item("current_balance")]);
    let recalc_due = admin_resolve(
        &mut dispute,
        Uuid::new_v4(),
        ResolutionOutcome::Rejected,
        "Records verified as accurate".to_string(),
        fixed_now(),
    )
    .unwrap();

    assert!(!recalc_due);
    assert_eq!(dispute.status, DisputeStatus::Rejected);
    assert_eq!(dispute.resolved_items_count(), 0);
}

#[test]
fn favorable_resolution_without_items_skips_recalc() {
    let mut dispute = open_dispute(vec![]);
    let recalc_due = admin_resolve(
        &mut dispute,
        Uuid::new_v4(),
        ResolutionOutcome::Resolved,
        "Noted, nothing to correct".to_string(),
        fixed_now(),
    )
    .unwrap();
    assert!(!recalc_due);
}

#[test]
fn consumer_update_amends_fields_and_journals() {
    let mut dispute = open_dispute(vec![]);
    let consumer = dispute.initiated_by;
    consumer_update(
        &mut dispute,
        consumer,
        ConsumerUpdate {
            description: Some("A longer corrected description of the problem".to_string()),
            supporting_documents: Some(vec!["statement-2026-05.pdf".to_string()]),
            affected_items: None,
        },
        fixed_now() + Duration::days(1),
    )
    .unwrap();

    assert_eq!(
        dispute.description,
        "A longer corrected description of the problem"
    );
    assert_eq!(dispute.supporting_documents.len(), 1);
    assert_eq!(dispute.status, DisputeStatus::Pending);
    assert_eq!(dispute.history.len(), 2);
    assert_eq!(dispute.history.last().unwrap().action, DisputeAction::Updated);
}

#[test]
fn consumer_update_rejects_short_description() {
    let mut dispute = open_dispute(vec![]);
    let consumer = dispute.initiated_by;
    let result = consumer_update(
        &mut dispute,
        consumer,
        ConsumerUpdate {
            description: Some("short".to_string()),
            supporting_documents: None,
            affected_items: None,
        },
        fixed_now(),
    );
    assert!(matches!(result, Err(AppError::Validation(_))));
    // Nothing was applied
    assert_eq!(dispute.history.len(), 1);
}

#[test]
fn resolution_time_rounds_up_partial_days() {
    let mut dispute = open_dispute(vec![]);
    admin_resolve(
        &mut dispute,
        Uuid::new_v4(),
        ResolutionOutcome::Rejected,
        "Verified".to_string(),
        fixed_now() + Duration::hours(30),
    )
    .unwrap();
    assert_eq!(dispute.resolution_time_days(), Some(2));
}
