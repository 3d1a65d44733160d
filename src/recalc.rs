//! Consistency coordinator.
//!
//! Invoked after any mutation to accounts, inquiries, public records, or a
//! favorable dispute resolution. Reloads the profile's full record set,
//! re-runs the scoring engine, and persists the result; the score history
//! entry is appended by the store only when the stored score actually
//! changes, so back-to-back recalculations with no intervening mutation
//! journal at most once.

use crate::errors::{AppError, ResultExt};
use crate::models::Profile;
use crate::scoring::compute_score;
use crate::store::BureauStore;
use chrono::Utc;
use uuid::Uuid;

/// Re-derives a profile's score from its current accounts, inquiries and
/// public records.
///
/// Returns `Ok(None)` when the profile does not exist. This is the single
/// tolerated soft failure in the core: records can legitimately land ahead
/// of profile provisioning during bulk loads, so the caller's mutation is
/// never rolled back — the condition is logged and surfaced as `None`.
///
/// The read-then-write here is deliberately not serialized against
/// concurrent recalculations of the same profile; the persisted score is
/// always derived from some valid (possibly stale) snapshot and the last
/// completed write wins.
pub async fn recalculate(
    store: &BureauStore,
    profile_id: Uuid,
) -> Result<Option<Profile>, AppError> {
    let Some(profile) = store.find_profile(profile_id).await? else {
        tracing::warn!(%profile_id, "profile not found for recalculation");
        return Ok(None);
    };

    let accounts = store
        .list_accounts(profile_id)
        .await
        .context("loading accounts for recalculation")?;
    let inquiries = store
        .list_inquiries(profile_id)
        .await
        .context("loading inquiries for recalculation")?;
    let public_records = store
        .list_public_records(profile_id)
        .await
        .context("loading public records for recalculation")?;

    let now = Utc::now();
    let score = compute_score(&accounts, &inquiries, &public_records, now);

    if score != profile.credit_score {
        tracing::info!(
            %profile_id,
            old_score = profile.credit_score,
            new_score = score,
            "credit score changed"
        );
    }

    store.update_profile_score(profile_id, score, now).await
}
