//! Dispute workflow.
//!
//! The state machine is a set of pure transition functions over `Dispute`
//! (`pending → investigating → {resolved, rejected}`, with a consumer
//! short-circuit `pending → canceled`); every illegal transition is a
//! `Conflict` naming both the current status and the attempted action.
//! The async service layer loads entities, authorizes the actor, persists,
//! and runs the side effects: the profile's `disputed` flag and the
//! recalculation that follows a favorable resolution.

use crate::errors::AppError;
use crate::models::{
    ActorRole, AffectedItem, Dispute, DisputeAction, DisputeEvent, DisputeReason, DisputeStatus,
    ProfileStatus,
};
use crate::recalc;
use crate::store::BureauStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Minimum length of a dispute description.
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Fields a consumer may amend while the dispute is still open.
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct ConsumerUpdate {
    pub description: Option<String>,
    pub supporting_documents: Option<Vec<String>>,
    pub affected_items: Option<Vec<AffectedItem>>,
}

/// Terminal outcome an administrator may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved,
    Rejected,
}

impl ResolutionOutcome {
    fn status(self) -> DisputeStatus {
        match self {
            ResolutionOutcome::Resolved => DisputeStatus::Resolved,
            ResolutionOutcome::Rejected => DisputeStatus::Rejected,
        }
    }

    fn action(self) -> DisputeAction {
        match self {
            ResolutionOutcome::Resolved => DisputeAction::Resolved,
            ResolutionOutcome::Rejected => DisputeAction::Rejected,
        }
    }
}

fn illegal_transition(attempted: &str, current: DisputeStatus) -> AppError {
    AppError::Conflict(format!(
        "illegal dispute transition: '{}' is not allowed from status '{}'",
        attempted,
        current.as_str()
    ))
}

fn push_event(
    dispute: &mut Dispute,
    action: DisputeAction,
    actor_id: Uuid,
    actor_role: ActorRole,
    notes: Option<String>,
    now: DateTime<Utc>,
) {
    dispute.history.push(DisputeEvent {
        action,
        actor_id,
        actor_role,
        timestamp: now,
        notes,
    });
    dispute.updated_at = now;
}

/// Validates inputs and builds a fresh `pending` dispute with its
/// `created` history entry.
pub fn new_dispute(
    profile_id: Uuid,
    account_id: Uuid,
    lender_id: Uuid,
    initiated_by: Uuid,
    reason: DisputeReason,
    description: String,
    supporting_documents: Vec<String>,
    affected_items: Vec<AffectedItem>,
    now: DateTime<Utc>,
) -> Result<Dispute, AppError> {
    if description.trim().len() < MIN_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "dispute description must be at least {} characters",
            MIN_DESCRIPTION_LEN
        )));
    }

    let mut dispute = Dispute {
        id: Uuid::new_v4(),
        profile_id,
        account_id,
        lender_id,
        initiated_by,
        reason,
        description,
        supporting_documents,
        affected_items,
        status: DisputeStatus::Pending,
        lender_response: None,
        resolution: None,
        history: Vec::new(),
        created_at: now,
        updated_at: now,
        resolved_at: None,
    };
    push_event(
        &mut dispute,
        DisputeAction::Created,
        initiated_by,
        ActorRole::Consumer,
        Some("Dispute created".to_string()),
        now,
    );
    Ok(dispute)
}

/// Consumer amendment; legal only while the dispute is open and never
/// changes the status.
pub fn consumer_update(
    dispute: &mut Dispute,
    actor_id: Uuid,
    changes: ConsumerUpdate,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if dispute.status.is_terminal() {
        return Err(illegal_transition("update", dispute.status));
    }

    if let Some(description) = changes.description {
        if description.trim().len() < MIN_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "dispute description must be at least {} characters",
                MIN_DESCRIPTION_LEN
            )));
        }
        dispute.description = description;
    }
    if let Some(documents) = changes.supporting_documents {
        dispute.supporting_documents = documents;
    }
    if let Some(items) = changes.affected_items {
        dispute.affected_items = items;
    }

    push_event(
        dispute,
        DisputeAction::Updated,
        actor_id,
        ActorRole::Consumer,
        Some("Dispute updated by consumer".to_string()),
        now,
    );
    Ok(())
}

/// Lender response; moves an open dispute to `investigating`.
pub fn lender_respond(
    dispute: &mut Dispute,
    actor_id: Uuid,
    response: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if dispute.status.is_terminal() {
        return Err(illegal_transition("respond", dispute.status));
    }

    dispute.lender_response = Some(response.clone());
    dispute.status = DisputeStatus::Investigating;
    push_event(
        dispute,
        DisputeAction::Responded,
        actor_id,
        ActorRole::Lender,
        Some(response),
        now,
    );
    Ok(())
}

/// Consumer cancellation; only a still-pending dispute can be withdrawn.
pub fn consumer_cancel(
    dispute: &mut Dispute,
    actor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if dispute.status != DisputeStatus::Pending {
        return Err(illegal_transition("cancel", dispute.status));
    }

    dispute.status = DisputeStatus::Canceled;
    dispute.resolved_at = Some(now);
    dispute.resolution = Some("Canceled by consumer".to_string());
    push_event(
        dispute,
        DisputeAction::Canceled,
        actor_id,
        ActorRole::Consumer,
        None,
        now,
    );
    Ok(())
}

/// Administrator resolution into a terminal state.
///
/// Returns whether a recalculation is due: only a favorable outcome with
/// at least one affected item changes reported data.
pub fn admin_resolve(
    dispute: &mut Dispute,
    actor_id: Uuid,
    outcome: ResolutionOutcome,
    resolution: String,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    if dispute.status.is_terminal() {
        return Err(illegal_transition("resolve", dispute.status));
    }

    dispute.status = outcome.status();
    dispute.resolution = Some(resolution.clone());
    dispute.resolved_at = Some(now);
    if outcome == ResolutionOutcome::Resolved {
        for item in &mut dispute.affected_items {
            item.resolved = true;
        }
    }
    push_event(
        dispute,
        outcome.action(),
        actor_id,
        ActorRole::Admin,
        Some(resolution),
        now,
    );

    Ok(outcome == ResolutionOutcome::Resolved && !dispute.affected_items.is_empty())
}

// ---- service layer ----

/// Command form of the dispute transitions exposed to the API layer.
#[derive(Debug, Clone)]
pub enum DisputeCommand {
    Update(ConsumerUpdate),
    Respond { response: String },
    Cancel,
    Resolve {
        outcome: ResolutionOutcome,
        resolution: String,
    },
}

/// Opens a dispute against an existing account and flags the owning
/// profile as `disputed`.
pub async fn create_dispute(
    store: &BureauStore,
    account_id: Uuid,
    consumer_id: Uuid,
    reason: DisputeReason,
    description: String,
    supporting_documents: Vec<String>,
    affected_items: Vec<AffectedItem>,
) -> Result<Dispute, AppError> {
    let account = store
        .find_account(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    if account.lender_id == consumer_id {
        return Err(AppError::Forbidden(
            "the reporting lender cannot dispute its own account".to_string(),
        ));
    }

    let profile = store
        .find_profile(account.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    if profile.user_id != consumer_id {
        return Err(AppError::Forbidden(
            "account does not belong to your credit profile".to_string(),
        ));
    }

    let dispute = new_dispute(
        profile.id,
        account.id,
        account.lender_id,
        consumer_id,
        reason,
        description,
        supporting_documents,
        affected_items,
        Utc::now(),
    )?;

    store.insert_dispute(&dispute).await?;

    // A freeze is orthogonal to the disputed flag and survives dispute
    // creation; the unfreeze path lands on `disputed` while open disputes
    // remain.
    if profile.status == ProfileStatus::Active {
        store
            .set_profile_status(profile.id, ProfileStatus::Disputed)
            .await?;
    }

    tracing::info!(dispute_id = %dispute.id, profile_id = %profile.id, "dispute opened");
    Ok(dispute)
}

/// Applies one transition to a dispute on behalf of an actor.
///
/// Authorization is ownership-based: consumers may only touch disputes they
/// initiated, lenders only disputes against accounts they report, and only
/// administrators may resolve.
pub async fn transition_dispute(
    store: &BureauStore,
    dispute_id: Uuid,
    actor_id: Uuid,
    actor_role: ActorRole,
    command: DisputeCommand,
) -> Result<Dispute, AppError> {
    let mut dispute = store
        .find_dispute(dispute_id)
        .await?
        .ok_or_else(|| AppError::NotFound("dispute not found".to_string()))?;

    let now = Utc::now();
    let mut recalc_due = false;
    // Events pushed past this point are the ones the store appends.
    let first_new_event = dispute.history.len();

    match command {
        DisputeCommand::Update(changes) => {
            require_consumer(&dispute, actor_id, actor_role)?;
            consumer_update(&mut dispute, actor_id, changes, now)?;
        }
        DisputeCommand::Respond { response } => {
            if actor_role != ActorRole::Lender || dispute.lender_id != actor_id {
                return Err(AppError::Forbidden(
                    "only the lender of the disputed account may respond".to_string(),
                ));
            }
            lender_respond(&mut dispute, actor_id, response, now)?;
        }
        DisputeCommand::Cancel => {
            require_consumer(&dispute, actor_id, actor_role)?;
            consumer_cancel(&mut dispute, actor_id, now)?;
        }
        DisputeCommand::Resolve {
            outcome,
            resolution,
        } => {
            if actor_role != ActorRole::Admin {
                return Err(AppError::Forbidden(
                    "only an administrator may resolve a dispute".to_string(),
                ));
            }
            recalc_due = admin_resolve(&mut dispute, actor_id, outcome, resolution, now)?;
        }
    }

    store
        .update_dispute(&dispute, &dispute.history[first_new_event..])
        .await?;

    // Leaving an open state may clear the profile's disputed flag; it is
    // recomputed from the remaining open disputes, not assumed.
    if dispute.status.is_terminal() {
        refresh_profile_dispute_flag(store, dispute.profile_id).await?;
    }

    if recalc_due {
        store
            .touch_account_report_date(dispute.account_id, now)
            .await?;
        recalc::recalculate(store, dispute.profile_id).await?;
    }

    Ok(dispute)
}

fn require_consumer(
    dispute: &Dispute,
    actor_id: Uuid,
    actor_role: ActorRole,
) -> Result<(), AppError> {
    if actor_role != ActorRole::Consumer || dispute.initiated_by != actor_id {
        return Err(AppError::Forbidden(
            "dispute does not belong to you".to_string(),
        ));
    }
    Ok(())
}

/// Reverts the profile to `active` once no open dispute remains against it.
async fn refresh_profile_dispute_flag(
    store: &BureauStore,
    profile_id: Uuid,
) -> Result<(), AppError> {
    let open = store.count_open_disputes(profile_id).await?;
    if open == 0 {
        if let Some(profile) = store.find_profile(profile_id).await? {
            if profile.status == ProfileStatus::Disputed {
                store
                    .set_profile_status(profile_id, ProfileStatus::Active)
                    .await?;
            }
        }
    }
    Ok(())
}
