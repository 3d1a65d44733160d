/// Unit tests for the derived entity functions computed on read.
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use credit_bureau_api::models::{
    score_category, Account, AccountStatus, AccountType, Collection, CollectionStatus, Inquiry,
    InquiringEntity, InquiryPurpose, InquiryType, PaymentEntry, PaymentStatus, Profile,
    ProfileStatus, PublicRecord, PublicRecordStatus, PublicRecordType,
};

fn fixed_now() -> DateTime<Utc> {
    "2026-06-01T12:00:00Z".parse().unwrap()
}

fn account(now: DateTime<Utc>, days_open: i64) -> Account {
    Account {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        account_type: AccountType::Loan,
        lender_id: Uuid::new_v4(),
        lender_name: "Acme Bank".to_string(),
        account_number: "4111222233334444".to_string(),
        open_date: now - Duration::days(days_open),
        close_date: None,
        credit_limit: None,
        current_balance: 0.0,
        original_amount: Some(1000.0),
        payment_history: Vec::new(),
        status: AccountStatus::Current,
        last_report_date: now,
        created_at: now,
    }
}

fn payment(now: DateTime<Utc>, status: PaymentStatus) -> PaymentEntry {
    PaymentEntry {
        due_date: now,
        amount_due: 100.0,
        amount_paid: 0.0,
        date_paid: None,
        status,
        reported_at: now,
    }
}

fn public_record(now: DateTime<Utc>, record_type: PublicRecordType) -> PublicRecord {
    PublicRecord {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        record_type,
        case_number: "CR-1".to_string(),
        court_name: "District Court".to_string(),
        filed_date: now - Duration::days(100),
        status: PublicRecordStatus::Filed,
        resolved_date: None,
        liability_amount: Some(5000.0),
        expires_from_record: now + Duration::days(3650),
        reported_by: "court feed".to_string(),
        created_at: now,
    }
}

#[test]
fn account_age_rounds_up_to_whole_months() {
    let now = fixed_now();
    assert_eq!(account(now, 90).account_age_months(now), 3);
    assert_eq!(account(now, 91).account_age_months(now), 4);
    assert_eq!(account(now, 0).account_age_months(now), 0);

    // Closed accounts measure to the close date, not to now
    let mut closed = account(now, 400);
    closed.close_date = Some(now - Duration::days(100));
    assert_eq!(closed.account_age_months(now), 10);
}

#[test]
fn payment_reliability_percentage() {
    let now = fixed_now();
    let mut a = account(now, 100);
    assert_eq!(a.payment_reliability(), 100, "empty history is fully reliable");

    a.payment_history = vec![
        payment(now, PaymentStatus::OnTime),
        payment(now, PaymentStatus::OnTime),
        payment(now, PaymentStatus::OnTime),
        payment(now, PaymentStatus::Late30),
    ];
    assert_eq!(a.payment_reliability(), 75);
}

#[test]
fn utilization_ratio_only_for_cards_with_limits() {
    let now = fixed_now();
    let mut card = account(now, 100);
    card.account_type = AccountType::CreditCard;
    card.original_amount = None;
    card.credit_limit = Some(1000.0);
    card.current_balance = 250.0;
    assert_eq!(card.utilization_ratio(), 0.25);

    card.credit_limit = Some(0.0);
    assert_eq!(card.utilization_ratio(), 0.0);

    let loan = account(now, 100);
    assert_eq!(loan.utilization_ratio(), 0.0);
}

#[test]
fn masked_number_hides_all_but_last_four() {
    let now = fixed_now();
    let a = account(now, 100);
    assert_eq!(a.masked_number(), "****4444");

    let mut short = account(now, 100);
    short.account_number = "123".to_string();
    assert_eq!(short.masked_number(), "123");
}

#[test]
fn status_derivation_precedence() {
    let now = fixed_now();

    let mut a = account(now, 400);
    a.close_date = Some(now - Duration::days(10));
    a.payment_history = vec![payment(now, PaymentStatus::Default)];
    // A trailing default outranks the close date
    assert_eq!(a.derived_status(now), AccountStatus::Default);

    a.payment_history = vec![payment(now, PaymentStatus::Late90)];
    assert_eq!(a.derived_status(now), AccountStatus::Delinquent);

    a.payment_history = vec![payment(now, PaymentStatus::Late30)];
    assert_eq!(a.derived_status(now), AccountStatus::Closed);

    // Future close date is not yet effective
    a.close_date = Some(now + Duration::days(10));
    assert_eq!(a.derived_status(now), AccountStatus::Current);

    a.close_date = None;
    a.payment_history.clear();
    assert_eq!(a.derived_status(now), AccountStatus::Current);
}

#[test]
fn inquiry_expiry_countdown() {
    let now = fixed_now();
    let mut inquiry = Inquiry {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        inquiring_entity: InquiringEntity {
            id: Uuid::new_v4(),
            name: "Acme Bank".to_string(),
        },
        inquiry_type: InquiryType::Hard,
        inquiry_purpose: InquiryPurpose::NewCredit,
        inquiry_date: now,
        expires_at: now + Duration::days(45),
        created_at: now,
    };

    assert!(!inquiry.is_expired(now));
    assert_eq!(inquiry.months_until_expiration(now), 2);

    inquiry.expires_at = now - Duration::seconds(1);
    assert!(inquiry.is_expired(now));
    assert_eq!(inquiry.months_until_expiration(now), 0);
}

#[test]
fn public_record_impact_severity_bands() {
    let now = fixed_now();
    let cases = [
        (PublicRecordType::Bankruptcy, "severe"),
        (PublicRecordType::Foreclosure, "high"),
        (PublicRecordType::TaxLien, "medium"),
        (PublicRecordType::Judgment, "medium"),
        (PublicRecordType::CivilSuit, "low"),
    ];
    for (record_type, severity) in cases {
        assert_eq!(
            public_record(now, record_type).impact_severity(now),
            severity
        );
    }

    // Resolved or expired filings carry no impact
    let mut discharged = public_record(now, PublicRecordType::Bankruptcy);
    discharged.status = PublicRecordStatus::Discharged;
    assert_eq!(discharged.impact_severity(now), "none");

    let mut expired = public_record(now, PublicRecordType::Bankruptcy);
    expired.expires_from_record = now - Duration::days(1);
    assert_eq!(expired.impact_severity(now), "none");
}

#[test]
fn collection_expiry() {
    let now = fixed_now();
    let mut collection = Collection {
        id: Uuid::new_v4(),
        profile_id: Uuid::new_v4(),
        original_account_id: None,
        collection_agency: "Recovery Inc".to_string(),
        original_creditor: "Acme Bank".to_string(),
        original_amount: 900.0,
        current_amount: 450.0,
        collection_date: now - Duration::days(100),
        status: CollectionStatus::Active,
        last_activity_date: now,
        expires_from_record: now + Duration::days(1),
        created_at: now,
    };
    assert!(!collection.is_expired(now));

    collection.expires_from_record = now - Duration::days(1);
    assert!(collection.is_expired(now));
}

#[test]
fn score_category_bands() {
    assert_eq!(score_category(850), "Excellent");
    assert_eq!(score_category(800), "Excellent");
    assert_eq!(score_category(799), "Very Good");
    assert_eq!(score_category(740), "Very Good");
    assert_eq!(score_category(670), "Good");
    assert_eq!(score_category(580), "Fair");
    assert_eq!(score_category(579), "Poor");
    assert_eq!(score_category(300), "Poor");
}

#[test]
fn frozen_profiles_accept_no_inquiries() {
    let now = fixed_now();
    let mut profile = Profile::new(
        Uuid::new_v4(),
        "123-45-6789".to_string(),
        "Jane Consumer".to_string(),
        None,
        None,
        now,
    );
    assert!(profile.accepts_inquiries());

    // The gate is type-agnostic: a freeze blocks soft inquiries too
    profile.status = ProfileStatus::Frozen;
    assert!(!profile.accepts_inquiries());

    profile.status = ProfileStatus::Disputed;
    assert!(profile.accepts_inquiries());
}
