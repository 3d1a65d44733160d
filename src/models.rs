use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Profile ============

/// Lifecycle status of a credit profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Active,
    Frozen,
    Disputed,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Frozen => "frozen",
            ProfileStatus::Disputed => "disputed",
        }
    }
}

/// One entry in the append-only score history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: i32,
    pub calculated_at: DateTime<Utc>,
}

/// A consumer's credit profile.
///
/// One per consumer, unique on both `user_id` and `national_id`. The score
/// is only mutated through the recalculation path; `score_history` is
/// append-only and grows exactly when the stored score changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// External identity reference (auth is out of scope for the core).
    pub user_id: Uuid,
    pub national_id: String,
    /// Display identity embedded for report snapshots.
    pub full_name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    /// Always within [300, 850].
    pub credit_score: i32,
    pub score_history: Vec<ScoreEntry>,
    pub status: ProfileStatus,
    pub fraud_alert: bool,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Lowest representable credit score.
pub const SCORE_MIN: i32 = 300;
/// Highest representable credit score.
pub const SCORE_MAX: i32 = 850;
/// Every recalculation rebuilds from this base, never from the prior score.
pub const SCORE_BASE: i32 = 700;

impl Profile {
    /// Creates a profile with the default score and an initial history entry.
    pub fn new(
        user_id: Uuid,
        national_id: String,
        full_name: String,
        address: Option<String>,
        date_of_birth: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            national_id,
            full_name,
            address,
            date_of_birth,
            credit_score: SCORE_BASE,
            score_history: vec![ScoreEntry {
                score: SCORE_BASE,
                calculated_at: now,
            }],
            status: ProfileStatus::Active,
            fraud_alert: false,
            last_updated: now,
            created_at: now,
        }
    }

    /// A frozen profile accepts no new inquiries, hard or soft.
    pub fn accepts_inquiries(&self) -> bool {
        self.status != ProfileStatus::Frozen
    }
}

/// Human-readable band for a numeric score.
pub fn score_category(score: i32) -> &'static str {
    if score >= 800 {
        "Excellent"
    } else if score >= 740 {
        "Very Good"
    } else if score >= 670 {
        "Good"
    } else if score >= 580 {
        "Fair"
    } else {
        "Poor"
    }
}

// ============ Account ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Loan,
    CreditCard,
    Mortgage,
    AutoLoan,
    StudentLoan,
    Utility,
}

impl AccountType {
    /// True for types that carry an original principal.
    pub fn is_installment(&self) -> bool {
        matches!(
            self,
            AccountType::Loan
                | AccountType::Mortgage
                | AccountType::AutoLoan
                | AccountType::StudentLoan
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Current,
    Closed,
    Delinquent,
    Default,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    OnTime,
    Late30,
    Late60,
    Late90,
    Default,
}

impl PaymentStatus {
    /// Late or defaulted entries are the ones that penalize the score.
    pub fn is_derogatory(&self) -> bool {
        !matches!(self, PaymentStatus::OnTime)
    }
}

/// One entry in an account's append-only payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub due_date: DateTime<Utc>,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub date_paid: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
    pub reported_at: DateTime<Utc>,
}

/// A lender-reported credit instrument owned by exactly one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub account_type: AccountType,
    pub lender_id: Uuid,
    pub lender_name: String,
    pub account_number: String,
    pub open_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    /// Present iff `account_type` is `credit_card`.
    pub credit_limit: Option<f64>,
    pub current_balance: f64,
    /// Present iff the type is an installment loan.
    pub original_amount: Option<f64>,
    pub payment_history: Vec<PaymentEntry>,
    pub status: AccountStatus,
    pub last_report_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Status is a pure function of the most recent payment entry and the
    /// close date: default > late_90 > closed > current.
    pub fn derived_status(&self, now: DateTime<Utc>) -> AccountStatus {
        match self.payment_history.last().map(|p| p.status) {
            Some(PaymentStatus::Default) => AccountStatus::Default,
            Some(PaymentStatus::Late90) => AccountStatus::Delinquent,
            _ => {
                if self.close_date.is_some_and(|d| d <= now) {
                    AccountStatus::Closed
                } else {
                    AccountStatus::Current
                }
            }
        }
    }

    /// Re-derives `status` from payment history and close date.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        self.status = self.derived_status(now);
    }

    /// Account age in whole months (rounded up), using the close date as the
    /// end when the account is closed.
    pub fn account_age_months(&self, now: DateTime<Utc>) -> i64 {
        let end = self.close_date.unwrap_or(now);
        let days = (end - self.open_date).num_days().abs();
        (days + 29) / 30
    }

    /// Percentage of on-time payments; an empty history counts as fully reliable.
    pub fn payment_reliability(&self) -> u32 {
        if self.payment_history.is_empty() {
            return 100;
        }
        let on_time = self
            .payment_history
            .iter()
            .filter(|p| p.status == PaymentStatus::OnTime)
            .count();
        ((on_time as f64 / self.payment_history.len() as f64) * 100.0).round() as u32
    }

    /// Balance-to-limit ratio for credit cards; 0 for other types or a zero limit.
    pub fn utilization_ratio(&self) -> f64 {
        match (self.account_type, self.credit_limit) {
            (AccountType::CreditCard, Some(limit)) if limit > 0.0 => {
                self.current_balance / limit
            }
            _ => 0.0,
        }
    }

    /// Account number with all but the last four characters hidden.
    pub fn masked_number(&self) -> String {
        let len = self.account_number.chars().count();
        if len <= 4 {
            return self.account_number.clone();
        }
        let tail: String = self
            .account_number
            .chars()
            .skip(len - 4)
            .collect();
        format!("****{}", tail)
    }
}

// ============ Inquiry ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryType {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryPurpose {
    NewCredit,
    CreditReview,
    AccountReview,
    Employment,
    Insurance,
    Prequalification,
    CreditCheck,
}

/// The party that performed a credit check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiringEntity {
    pub id: Uuid,
    pub name: String,
}

/// Record of a third party accessing a profile.
///
/// Immutable after creation; expired inquiries stay stored for audit and are
/// excluded from scoring by date filtering, never by deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub inquiring_entity: InquiringEntity,
    pub inquiry_type: InquiryType,
    pub inquiry_purpose: InquiryPurpose,
    pub inquiry_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Inquiry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn months_until_expiration(&self, now: DateTime<Utc>) -> i64 {
        if self.is_expired(now) {
            return 0;
        }
        let days = (self.expires_at - now).num_days();
        (days + 29) / 30
    }
}

// ============ Public record ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicRecordType {
    Bankruptcy,
    TaxLien,
    Judgment,
    Foreclosure,
    CivilSuit,
}

impl PublicRecordType {
    /// True for filing types that must carry a liability amount.
    pub fn requires_liability(&self) -> bool {
        matches!(
            self,
            PublicRecordType::TaxLien | PublicRecordType::Judgment | PublicRecordType::CivilSuit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicRecordStatus {
    Filed,
    Discharged,
    Dismissed,
    Satisfied,
    Vacated,
}

/// A judicial or financial public filing against a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub record_type: PublicRecordType,
    pub case_number: String,
    pub court_name: String,
    pub filed_date: DateTime<Utc>,
    pub status: PublicRecordStatus,
    pub resolved_date: Option<DateTime<Utc>>,
    pub liability_amount: Option<f64>,
    pub expires_from_record: DateTime<Utc>,
    pub reported_by: String,
    pub created_at: DateTime<Utc>,
}

impl PublicRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_from_record < now
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            PublicRecordStatus::Discharged
                | PublicRecordStatus::Dismissed
                | PublicRecordStatus::Satisfied
                | PublicRecordStatus::Vacated
        )
    }

    /// Severity band used by reporting; expired or resolved filings carry none.
    pub fn impact_severity(&self, now: DateTime<Utc>) -> &'static str {
        if self.is_expired(now) || self.is_resolved() {
            return "none";
        }
        match self.record_type {
            PublicRecordType::Bankruptcy => "severe",
            PublicRecordType::Foreclosure => "high",
            PublicRecordType::TaxLien | PublicRecordType::Judgment => "medium",
            PublicRecordType::CivilSuit => "low",
        }
    }
}

// ============ Collection ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Active,
    Paid,
    Settled,
    Disputed,
}

/// A debt placed with a collection agency; read into report snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub original_account_id: Option<Uuid>,
    pub collection_agency: String,
    pub original_creditor: String,
    pub original_amount: f64,
    pub current_amount: f64,
    pub collection_date: DateTime<Utc>,
    pub status: CollectionStatus,
    pub last_activity_date: DateTime<Utc>,
    pub expires_from_record: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_from_record < now
    }
}

// ============ Dispute ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    NotMine,
    IncorrectAmount,
    PaidDebt,
    IncorrectStatus,
    DuplicateAccount,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Pending,
    Investigating,
    Resolved,
    Rejected,
    Canceled,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Pending => "pending",
            DisputeStatus::Investigating => "investigating",
            DisputeStatus::Resolved => "resolved",
            DisputeStatus::Rejected => "rejected",
            DisputeStatus::Canceled => "canceled",
        }
    }

    /// Open disputes are the ones that keep a profile in `disputed` status.
    pub fn is_open(&self) -> bool {
        matches!(self, DisputeStatus::Pending | DisputeStatus::Investigating)
    }

    /// Terminal disputes never revert and accept no further edits.
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Consumer,
    Lender,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Consumer => "consumer",
            ActorRole::Lender => "lender",
            ActorRole::Admin => "admin",
        }
    }
}

/// Action recorded in a dispute's history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeAction {
    Created,
    Updated,
    Responded,
    Resolved,
    Rejected,
    Canceled,
}

/// One claimed correction inside a dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedItem {
    pub field: String,
    pub current_value: serde_json::Value,
    pub claimed_value: serde_json::Value,
    pub resolved: bool,
}

/// One entry in a dispute's append-only history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeEvent {
    pub action: DisputeAction,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A consumer's formal challenge against one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub account_id: Uuid,
    /// Denormalized from the account for lender-side authorization.
    pub lender_id: Uuid,
    pub initiated_by: Uuid,
    pub reason: DisputeReason,
    pub description: String,
    pub supporting_documents: Vec<String>,
    pub affected_items: Vec<AffectedItem>,
    pub status: DisputeStatus,
    pub lender_response: Option<String>,
    pub resolution: Option<String>,
    pub history: Vec<DisputeEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    pub fn resolution_time_days(&self) -> Option<i64> {
        let resolved = self.resolved_at?;
        let days = (resolved - self.created_at).num_days();
        Some(if (resolved - self.created_at).num_seconds() % 86_400 != 0 {
            days + 1
        } else {
            days
        })
    }

    pub fn resolved_items_count(&self) -> usize {
        self.affected_items.iter().filter(|i| i.resolved).count()
    }

    pub fn progress_percentage(&self) -> u8 {
        match self.status {
            DisputeStatus::Pending => 0,
            DisputeStatus::Investigating => 50,
            DisputeStatus::Resolved | DisputeStatus::Rejected | DisputeStatus::Canceled => 100,
        }
    }
}

// ============ Report ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Full,
    Summary,
    Specialized,
}

/// One entry in a report's append-only access log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEntry {
    pub user_id: Uuid,
    pub accessed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

/// Personal section of a report snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPersonalInfo {
    pub name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub national_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAccount {
    pub lender_name: String,
    pub account_type: AccountType,
    pub account_status: AccountStatus,
    pub open_date: DateTime<Utc>,
    pub last_report_date: DateTime<Utc>,
    pub current_balance: f64,
    pub payment_history: Vec<PaymentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInquiry {
    pub inquiring_entity: String,
    pub inquiry_type: InquiryType,
    pub inquiry_purpose: InquiryPurpose,
    pub inquiry_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPublicRecord {
    pub record_type: PublicRecordType,
    pub court_name: String,
    pub filed_date: DateTime<Utc>,
    pub status: PublicRecordStatus,
    pub liability_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCollection {
    pub collection_agency: String,
    pub original_creditor: String,
    pub original_amount: f64,
    pub current_amount: f64,
    pub collection_date: DateTime<Utc>,
    pub status: CollectionStatus,
}

/// Value-copied snapshot of a profile's bureau data.
///
/// Holds no references to the live entities; later mutations to the source
/// records never alter a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub personal_info: ReportPersonalInfo,
    pub credit_score: i32,
    pub score_category: String,
    pub accounts: Vec<ReportAccount>,
    pub inquiries: Vec<ReportInquiry>,
    pub public_records: Vec<ReportPublicRecord>,
    pub collections: Vec<ReportCollection>,
}

/// An immutable, access-controlled report of a profile's bureau data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub requested_by: Uuid,
    pub generated_at: DateTime<Utc>,
    pub report_type: ReportType,
    pub report_data: ReportData,
    pub expires_at: DateTime<Utc>,
    /// Globally unique; the sole credential for lender retrieval.
    pub access_token: String,
    pub access_log: Vec<AccessEntry>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> i64 {
        if self.is_expired(now) {
            return 0;
        }
        let secs = (self.expires_at - now).num_seconds();
        (secs + 86_399) / 86_400
    }

    pub fn access_count(&self) -> usize {
        self.access_log.len()
    }
}
