/// Property-based tests using proptest
/// Invariants of the scoring engine and access token generation.
use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use credit_bureau_api::models::{
    Account, AccountStatus, AccountType, Inquiry, InquiringEntity, InquiryPurpose, InquiryType,
    PaymentEntry, PaymentStatus, PublicRecord, PublicRecordStatus, PublicRecordType, SCORE_MAX,
    SCORE_MIN,
};
use credit_bureau_api::reports::generate_access_token;
use credit_bureau_api::scoring::compute_score;

fn fixed_now() -> DateTime<Utc> {
    "2026-06-01T12:00:00Z".parse().unwrap()
}

fn build_card(
    now: DateTime<Utc>,
    balance: f64,
    limit: f64,
    days_open: i64,
    late_payments: usize,
) -> Account {
    Account {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        account_type: AccountType::CreditCard,
        lender_id: Uuid::new_v4(),
        lender_name: "Acme Bank".to_string(),
        account_number: "4111".to_string(),
        open_date: now - Duration::days(days_open),
        close_date: None,
        credit_limit: Some(limit),
        current_balance: balance,
        original_amount: None,
        payment_history: (0..late_payments)
            .map(|_| PaymentEntry {
                due_date: now,
                amount_due: 100.0,
                amount_paid: 0.0,
                date_paid: None,
                status: PaymentStatus::Late30,
                reported_at: now,
            })
            .collect(),
        status: AccountStatus::Current,
        last_report_date: now,
        created_at: now,
    }
}

fn build_inquiry(now: DateTime<Utc>, days_ago: i64) -> Inquiry {
    Inquiry {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        inquiring_entity: InquiringEntity {
            id: Uuid::new_v4(),
            name: "Lender".to_string(),
        },
        inquiry_type: InquiryType::Hard,
        inquiry_purpose: InquiryPurpose::NewCredit,
        inquiry_date: now - Duration::days(days_ago),
        expires_at: now + Duration::days(730),
        created_at: now,
    }
}

fn build_bankruptcy(now: DateTime<Utc>, discharged: bool) -> PublicRecord {
    PublicRecord {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        record_type: PublicRecordType::Bankruptcy,
        case_number: "BK-1".to_string(),
        court_name: "District Court".to_string(),
        filed_date: now - Duration::days(100),
        status: if discharged {
            PublicRecordStatus::Discharged
        } else {
            PublicRecordStatus::Filed
        },
        resolved_date: None,
        liability_amount: None,
        expires_from_record: now + Duration::days(3650),
        reported_by: "court feed".to_string(),
        created_at: now,
    }
}

proptest! {
    // The clamp is the hard contract: no input drives the score outside the band.
    #[test]
    fn score_always_within_band(
        balance in 0.0f64..100_000.0,
        limit in 0.0f64..50_000.0,
        days_open in 0i64..10_000,
        late_payments in 0usize..60,
        inquiry_days in proptest::collection::vec(0i64..800, 0..30),
        bankruptcies in 0usize..4,
    ) {
        let now = fixed_now();
        let accounts = vec![build_card(now, balance, limit, days_open, late_payments)];
        let inquiries: Vec<Inquiry> =
            inquiry_days.iter().map(|&d| build_inquiry(now, d)).collect();
        let records: Vec<PublicRecord> =
            (0..bankruptcies).map(|i| build_bankruptcy(now, i % 2 == 0)).collect();

        let score = compute_score(&accounts, &inquiries, &records, now);
        prop_assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
    }

    // Same snapshot, same instant, same score.
    #[test]
    fn score_is_deterministic(
        balance in 0.0f64..10_000.0,
        limit in 1.0f64..10_000.0,
        days_open in 0i64..5_000,
        late_payments in 0usize..20,
    ) {
        let now = fixed_now();
        let accounts = vec![build_card(now, balance, limit, days_open, late_payments)];
        let first = compute_score(&accounts, &[], &[], now);
        let second = compute_score(&accounts, &[], &[], now);
        prop_assert_eq!(first, second);
    }

    // Adding derogatory entries never raises the score.
    #[test]
    fn more_late_payments_never_help(
        balance in 0.0f64..5_000.0,
        limit in 1.0f64..10_000.0,
        days_open in 0i64..5_000,
        late_payments in 0usize..30,
    ) {
        let now = fixed_now();
        let fewer = vec![build_card(now, balance, limit, days_open, late_payments)];
        let more = vec![build_card(now, balance, limit, days_open, late_payments + 1)];
        prop_assert!(
            compute_score(&more, &[], &[], now) <= compute_score(&fewer, &[], &[], now)
        );
    }
}

proptest! {
    #[test]
    fn access_tokens_always_64_lower_hex(_i in 0u8..50) {
        let token = generate_access_token();
        prop_assert_eq!(token.len(), 64);
        prop_assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
