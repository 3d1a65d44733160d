//! Report snapshot service.
//!
//! A report is a value-copied freeze of a profile's bureau data: the
//! builder reads the live entities once and copies every field it needs
//! into `ReportData`, so later mutations to the sources never reach a
//! generated report. Retrieval is gated by a storage-unique random access
//! token and an expiry window, and every access is journaled.

use crate::errors::AppError;
use crate::models::{
    score_category, AccessEntry, Account, Collection, Inquiry, InquiryPurpose, InquiryType,
    InquiringEntity, Profile, ProfileStatus, PublicRecord, Report, ReportAccount, ReportCollection,
    ReportData, ReportInquiry, ReportPersonalInfo, ReportPublicRecord, ReportType,
};
use crate::recalc;
use crate::store::BureauStore;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Reports stay retrievable for this long after generation.
const REPORT_TTL_DAYS: i64 = 30;
/// Inquiries created by a lender report request expire after two years.
const INQUIRY_TTL_DAYS: i64 = 730;
/// Hard-inquiry cap for a consumer's full report.
const FULL_INQUIRY_CAP: usize = 25;
/// Hard-inquiry cap for summary and lender reports.
const SUMMARY_INQUIRY_CAP: usize = 5;
/// Payment entries exposed outside a consumer's full report.
const LIMITED_PAYMENT_ENTRIES: usize = 6;
/// Token collisions are vanishingly rare; a handful of retries is plenty.
const TOKEN_INSERT_ATTEMPTS: u32 = 3;

/// Generates a random access token: 32 CSPRNG bytes, hex encoded.
pub fn generate_access_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    hex::encode(bytes)
}

/// Builds the frozen snapshot for a report.
///
/// Only hard inquiries appear, most recent first, capped at 25 for a
/// consumer's full report and 5 otherwise; payment history is truncated to
/// the first six entries except in the consumer's full view.
pub fn build_report_data(
    profile: &Profile,
    accounts: &[Account],
    inquiries: &[Inquiry],
    public_records: &[PublicRecord],
    collections: &[Collection],
    report_type: ReportType,
    lender_view: bool,
) -> ReportData {
    let full_history = !lender_view && report_type == ReportType::Full;
    let inquiry_cap = if lender_view || report_type == ReportType::Summary {
        SUMMARY_INQUIRY_CAP
    } else {
        FULL_INQUIRY_CAP
    };

    let mut hard_inquiries: Vec<&Inquiry> = inquiries
        .iter()
        .filter(|i| i.inquiry_type == InquiryType::Hard)
        .collect();
    hard_inquiries.sort_by(|a, b| b.inquiry_date.cmp(&a.inquiry_date));
    hard_inquiries.truncate(inquiry_cap);

    ReportData {
        personal_info: ReportPersonalInfo {
            name: profile.full_name.clone(),
            address: profile.address.clone(),
            date_of_birth: profile.date_of_birth,
            national_id: profile.national_id.clone(),
        },
        credit_score: profile.credit_score,
        score_category: score_category(profile.credit_score).to_string(),
        accounts: accounts
            .iter()
            .map(|account| ReportAccount {
                lender_name: account.lender_name.clone(),
                account_type: account.account_type,
                account_status: account.status,
                open_date: account.open_date,
                last_report_date: account.last_report_date,
                current_balance: account.current_balance,
                payment_history: if full_history {
                    account.payment_history.clone()
                } else {
                    account
                        .payment_history
                        .iter()
                        .take(LIMITED_PAYMENT_ENTRIES)
                        .cloned()
                        .collect()
                },
            })
            .collect(),
        inquiries: hard_inquiries
            .iter()
            .map(|inquiry| ReportInquiry {
                inquiring_entity: inquiry.inquiring_entity.name.clone(),
                inquiry_type: inquiry.inquiry_type,
                inquiry_purpose: inquiry.inquiry_purpose,
                inquiry_date: inquiry.inquiry_date,
            })
            .collect(),
        public_records: public_records
            .iter()
            .map(|record| ReportPublicRecord {
                record_type: record.record_type,
                court_name: record.court_name.clone(),
                filed_date: record.filed_date,
                status: record.status,
                liability_amount: record.liability_amount,
            })
            .collect(),
        collections: collections
            .iter()
            .map(|collection| ReportCollection {
                collection_agency: collection.collection_agency.clone(),
                original_creditor: collection.original_creditor.clone(),
                original_amount: collection.original_amount,
                current_amount: collection.current_amount,
                collection_date: collection.collection_date,
                status: collection.status,
            })
            .collect(),
    }
}

/// Generates a report for the consumer who owns the profile.
pub async fn generate_report(
    store: &BureauStore,
    profile_id: Uuid,
    requester_id: Uuid,
    report_type: ReportType,
    origin: Option<String>,
) -> Result<Report, AppError> {
    let profile = store
        .find_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    let data = load_and_snapshot(store, &profile, report_type, false).await?;
    persist_report(store, &profile, requester_id, report_type, data, origin).await
}

/// Lender flow: records a hard `credit_check` inquiry before the snapshot
/// is taken, then recalculates so the new inquiry lands in the next score,
/// not the one frozen into this report.
pub async fn request_report(
    store: &BureauStore,
    profile_id: Uuid,
    requester_id: Uuid,
    requester_name: String,
    report_type: ReportType,
    origin: Option<String>,
) -> Result<Report, AppError> {
    let profile = store
        .find_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    if profile.status == ProfileStatus::Frozen {
        return Err(AppError::Forbidden(
            "this credit profile is frozen and cannot be accessed".to_string(),
        ));
    }

    let now = Utc::now();
    let inquiry = Inquiry {
        id: Uuid::new_v4(),
        profile_id: profile.id,
        inquiring_entity: InquiringEntity {
            id: requester_id,
            name: requester_name,
        },
        inquiry_type: InquiryType::Hard,
        inquiry_purpose: InquiryPurpose::CreditCheck,
        inquiry_date: now,
        expires_at: now + Duration::days(INQUIRY_TTL_DAYS),
        created_at: now,
    };
    store.insert_inquiry(&inquiry).await?;

    let data = load_and_snapshot(store, &profile, report_type, true).await?;
    let report = persist_report(store, &profile, requester_id, report_type, data, origin).await?;

    recalc::recalculate(store, profile.id).await?;

    Ok(report)
}

/// Retrieves a report by its access token, appending to the access log.
///
/// The snapshot is never touched: a fetch mutates only the log.
pub async fn fetch_report_by_token(
    store: &BureauStore,
    token: &str,
    accessor_id: Uuid,
    origin: Option<String>,
) -> Result<Report, AppError> {
    let report = store.find_report_by_token(token).await?.ok_or_else(|| {
        AppError::NotFound("report not found or access token is invalid".to_string())
    })?;

    let now = Utc::now();
    if report.is_expired(now) {
        return Err(AppError::Expired("report has expired".to_string()));
    }

    let entry = AccessEntry {
        user_id: accessor_id,
        accessed_at: now,
        ip_address: origin,
    };
    store
        .append_report_access(report.id, &entry)
        .await?
        .ok_or_else(|| AppError::Internal("report vanished while recording access".to_string()))
}

async fn load_and_snapshot(
    store: &BureauStore,
    profile: &Profile,
    report_type: ReportType,
    lender_view: bool,
) -> Result<ReportData, AppError> {
    let accounts = store.list_accounts(profile.id).await?;
    let inquiries = store.list_inquiries(profile.id).await?;
    let public_records = store.list_public_records(profile.id).await?;
    let collections = store.list_collections(profile.id).await?;

    Ok(build_report_data(
        profile,
        &accounts,
        &inquiries,
        &public_records,
        &collections,
        report_type,
        lender_view,
    ))
}

/// Persists a report with its initial access-log entry, regenerating the
/// token on a storage-level uniqueness collision.
async fn persist_report(
    store: &BureauStore,
    profile: &Profile,
    requester_id: Uuid,
    report_type: ReportType,
    data: ReportData,
    origin: Option<String>,
) -> Result<Report, AppError> {
    let now = Utc::now();

    for _ in 0..TOKEN_INSERT_ATTEMPTS {
        let report = Report {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            requested_by: requester_id,
            generated_at: now,
            report_type,
            report_data: data.clone(),
            expires_at: now + Duration::days(REPORT_TTL_DAYS),
            access_token: generate_access_token(),
            access_log: vec![AccessEntry {
                user_id: requester_id,
                accessed_at: now,
                ip_address: origin.clone(),
            }],
            created_at: now,
        };

        if store.insert_report(&report).await? {
            tracing::info!(report_id = %report.id, profile_id = %profile.id, "report generated");
            return Ok(report);
        }
        tracing::warn!(profile_id = %profile.id, "access token collision, regenerating");
    }

    Err(AppError::Internal(
        "could not allocate a unique report access token".to_string(),
    ))
}
