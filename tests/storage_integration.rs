use std::env;
use uuid::Uuid;

use chrono::{Duration, Utc};
use credit_bureau_api::db::Database;
use credit_bureau_api::disputes::{self, DisputeCommand, ResolutionOutcome};
use credit_bureau_api::models::{
    Account, AccountStatus, AccountType, ActorRole, AffectedItem, DisputeReason, DisputeStatus,
    PaymentEntry, PaymentStatus, Profile, ProfileStatus,
};
use credit_bureau_api::recalc;
use credit_bureau_api::store::BureauStore;

fn test_account(profile_id: Uuid, lender_id: Uuid) -> Account {
    let now = Utc::now();
    Account {
        id: Uuid::new_v4(),
        profile_id,
        account_type: AccountType::Loan,
        lender_id,
        lender_name: "Smoke Test Lender".to_string(),
        account_number: "0000-0001".to_string(),
        open_date: now - Duration::days(400),
        close_date: None,
        credit_limit: None,
        current_balance: 500.0,
        original_amount: Some(1000.0),
        payment_history: Vec::new(),
        status: AccountStatus::Current,
        last_report_date: now,
        created_at: now,
    }
}

fn test_profile() -> Profile {
    Profile::new(
        Uuid::new_v4(),
        format!("it-{}", Uuid::new_v4().simple()),
        "Smoke Test Consumer".to_string(),
        None,
        None,
        Utc::now(),
    )
}

/// Integration smoke test for the record store and recalculation path.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run (the schema from schema.sql must be applied).
#[tokio::test]
#[ignore]
async fn recalculation_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 5).await?;
    let store = BureauStore::new(db.pool.clone());

    let now = Utc::now();
    // Unique identifiers keep repeated runs from colliding.
    let profile = test_profile();
    store.insert_profile(&profile).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let account = test_account(profile.id, Uuid::new_v4());
    store.insert_account(&account).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let entry = PaymentEntry {
        due_date: now - Duration::days(30),
        amount_due: 100.0,
        amount_paid: 0.0,
        date_paid: None,
        status: PaymentStatus::Late30,
        reported_at: now,
    };
    store
        .append_payment(account.id, &entry, AccountStatus::Current, now)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // One late payment on a 400-day-old account: 700 - 15 + 10
    let updated = recalc::recalculate(&store, profile.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("profile vanished"))?;
    assert_eq!(updated.credit_score, 695);
    assert_eq!(updated.score_history.len(), 2);

    // Recalculating without an intervening mutation must not journal again.
    let again = recalc::recalculate(&store, profile.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("profile vanished"))?;
    assert_eq!(again.credit_score, 695);
    assert_eq!(again.score_history.len(), 2);

    // A scalar-terms update must leave the already-appended payment entry
    // in place even though the caller's read predates the append.
    let updated = store
        .update_account_terms(
            account.id,
            250.0,
            account.credit_limit,
            account.close_date,
            AccountStatus::Current,
            Utc::now(),
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("account vanished"))?;
    assert_eq!(updated.current_balance, 250.0);
    assert_eq!(updated.payment_history.len(), 1);

    Ok(())
}

/// End-to-end dispute lifecycle against a live database: profile flag
/// side effects, the recalculation trigger on favorable resolution, and
/// freeze/dispute orthogonality.
#[tokio::test]
#[ignore]
async fn dispute_lifecycle_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 5).await?;
    let store = BureauStore::new(db.pool.clone());

    let profile = test_profile();
    store.insert_profile(&profile).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let lender_id = Uuid::new_v4();
    let account = test_account(profile.id, lender_id);
    store.insert_account(&account).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let dispute = disputes::create_dispute(
        &store,
        account.id,
        profile.user_id,
        DisputeReason::IncorrectAmount,
        "The reported balance does not match my statements".to_string(),
        vec![],
        vec![AffectedItem {
            field: "current_balance".to_string(),
            current_value: serde_json::json!(500.0),
            claimed_value: serde_json::json!(100.0),
            resolved: false,
        }],
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let flagged = store
        .find_profile(profile.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("profile vanished"))?;
    assert_eq!(flagged.status, ProfileStatus::Disputed);

    let responded = disputes::transition_dispute(
        &store,
        dispute.id,
        lender_id,
        ActorRole::Lender,
        DisputeCommand::Respond {
            response: "Reviewing our records".to_string(),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(responded.status, DisputeStatus::Investigating);

    let resolved = disputes::transition_dispute(
        &store,
        dispute.id,
        Uuid::new_v4(),
        ActorRole::Admin,
        DisputeCommand::Resolve {
            outcome: ResolutionOutcome::Resolved,
            resolution: "Lender confirmed the error".to_string(),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.resolved_items_count(), 1);

    // Re-read from storage: every appended history event survived
    let stored = store
        .find_dispute(dispute.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("dispute vanished"))?;
    assert_eq!(stored.status, DisputeStatus::Resolved);
    assert_eq!(stored.history.len(), 3);
    assert_eq!(stored.resolved_items_count(), 1);

    // The only open dispute is gone, so the profile reverts to active.
    let cleared = store
        .find_profile(profile.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("profile vanished"))?;
    assert_eq!(cleared.status, ProfileStatus::Active);

    // The favorable resolution touched the account and fired a
    // recalculation for its profile.
    let touched = store
        .find_account(account.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("account vanished"))?;
    assert!(touched.last_report_date > account.last_report_date);
    // 400-day-old clean account: 700 + 10, journaled by the recalculation
    assert_eq!(cleared.credit_score, 710);
    assert_eq!(cleared.score_history.len(), 2);

    // A freeze survives dispute creation; it is the unfreeze that decides
    // between active and disputed.
    store
        .set_profile_status(profile.id, ProfileStatus::Frozen)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    disputes::create_dispute(
        &store,
        account.id,
        profile.user_id,
        DisputeReason::IncorrectStatus,
        "The account status reported here is wrong".to_string(),
        vec![],
        vec![],
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let still_frozen = store
        .find_profile(profile.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("profile vanished"))?;
    assert_eq!(still_frozen.status, ProfileStatus::Frozen);
    assert_eq!(
        store
            .count_open_disputes(profile.id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?,
        1
    );

    Ok(())
}
