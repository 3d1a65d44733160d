use crate::config::Config;
use crate::disputes::{self, ConsumerUpdate, DisputeCommand, ResolutionOutcome};
use crate::errors::AppError;
use crate::models::*;
use crate::recalc;
use crate::reports;
use crate::scoring::compute_score;
use crate::store::BureauStore;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Cache for consumer user id -> profile id. The mapping is immutable
    /// once the profile exists, so a hit skips one lookup per consumer call.
    pub profile_id_cache: Cache<Uuid, Uuid>,
}

impl AppState {
    fn store(&self) -> BureauStore {
        BureauStore::new(self.db.clone())
    }
}

/// Identity forwarded by the gateway on every authenticated request.
///
/// Authentication itself happens upstream; these headers are trusted here.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| {
                AppError::Forbidden("missing or malformed x-actor-id header".to_string())
            })?;

        let role = match parts.headers.get("x-actor-role").and_then(|v| v.to_str().ok()) {
            Some("consumer") => ActorRole::Consumer,
            Some("lender") => ActorRole::Lender,
            Some("admin") => ActorRole::Admin,
            _ => {
                return Err(AppError::Forbidden(
                    "missing or unknown x-actor-role header".to_string(),
                ))
            }
        };

        Ok(Actor { id, role })
    }
}

/// Client origin as reported by the proxy, for access logs.
fn client_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn national_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{4,19}$").unwrap())
}

fn require_admin(actor: Actor) -> Result<(), AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "administrator role required".to_string(),
        ));
    }
    Ok(())
}

/// Loads a profile the actor is allowed to act on: its owner, or an admin.
async fn load_owned_profile(
    store: &BureauStore,
    profile_id: Uuid,
    actor: Actor,
) -> Result<Profile, AppError> {
    let profile = store
        .find_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    if !actor.is_admin() && profile.user_id != actor.id {
        return Err(AppError::Forbidden(
            "credit profile does not belong to you".to_string(),
        ));
    }
    Ok(profile)
}

/// Resolves the calling consumer's profile, via the identity cache.
async fn resolve_own_profile(state: &AppState, actor: Actor) -> Result<Profile, AppError> {
    let store = state.store();

    if let Some(profile_id) = state.profile_id_cache.get(&actor.id).await {
        if let Some(profile) = store.find_profile(profile_id).await? {
            return Ok(profile);
        }
        state.profile_id_cache.invalidate(&actor.id).await;
    }

    let profile = store
        .find_profile_by_user(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no credit profile for this consumer".to_string()))?;

    state
        .profile_id_cache
        .insert(actor.id, profile.id)
        .await;
    Ok(profile)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "credit-bureau-api",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

// ============ Profiles ============

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: Uuid,
    pub national_id: String,
    pub full_name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
}

/// POST /api/v1/profiles
///
/// Provisions a credit profile for a consumer, seeded at the base score
/// with its first score-history entry.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    require_admin(actor)?;
    tracing::info!(user_id = %req.user_id, "POST /profiles");

    if !national_id_pattern().is_match(&req.national_id) {
        return Err(AppError::Validation(
            "national_id must be 5-20 alphanumeric characters".to_string(),
        ));
    }
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name is required".to_string()));
    }

    let profile = Profile::new(
        req.user_id,
        req.national_id,
        req.full_name,
        req.address,
        req.date_of_birth,
        Utc::now(),
    );
    state.store().insert_profile(&profile).await?;

    tracing::info!(profile_id = %profile.id, "credit profile created");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/profiles/me
pub async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Profile>, AppError> {
    let profile = resolve_own_profile(&state, actor).await?;
    Ok(Json(profile))
}

/// GET /api/v1/profiles/:id
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let profile = load_owned_profile(&state.store(), id, actor).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profiles/:id/freeze
///
/// Freezing blocks new hard inquiries and lender report requests until the
/// owner lifts it.
pub async fn freeze_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let store = state.store();
    let profile = load_owned_profile(&store, id, actor).await?;

    if profile.status == ProfileStatus::Frozen {
        return Err(AppError::Conflict(
            "credit profile is already frozen".to_string(),
        ));
    }

    let updated = store
        .set_profile_status(id, ProfileStatus::Frozen)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    tracing::info!(profile_id = %id, "credit profile frozen");
    Ok(Json(updated))
}

/// POST /api/v1/profiles/:id/unfreeze
pub async fn unfreeze_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let store = state.store();
    let profile = load_owned_profile(&store, id, actor).await?;

    if profile.status != ProfileStatus::Frozen {
        return Err(AppError::Conflict(
            "credit profile is not frozen".to_string(),
        ));
    }

    // An unfreeze lands on `disputed` when open disputes remain.
    let next = if store.count_open_disputes(id).await? > 0 {
        ProfileStatus::Disputed
    } else {
        ProfileStatus::Active
    };
    let updated = store
        .set_profile_status(id, next)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    tracing::info!(profile_id = %id, status = next.as_str(), "credit profile unfrozen");
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct FraudAlertRequest {
    pub fraud_alert: bool,
}

/// POST /api/v1/profiles/:id/fraud-alert
pub async fn set_fraud_alert(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<FraudAlertRequest>,
) -> Result<Json<Profile>, AppError> {
    let store = state.store();
    load_owned_profile(&store, id, actor).await?;

    let updated = store
        .set_fraud_alert(id, req.fraud_alert)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    tracing::info!(profile_id = %id, fraud_alert = req.fraud_alert, "fraud alert updated");
    Ok(Json(updated))
}

/// Administrative corrections: only these three fields are reachable, and an
/// unexpected field is an error rather than a silent drop.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminProfileUpdate {
    pub status: Option<ProfileStatus>,
    pub fraud_alert: Option<bool>,
    pub credit_score: Option<i32>,
}

/// PATCH /api/v1/profiles/:id
///
/// A direct score write goes through the same journaling path as the
/// engine, so the history entry is appended when the score changes.
pub async fn admin_update_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    require_admin(actor)?;
    tracing::info!(profile_id = %id, "PATCH /profiles");

    let store = state.store();
    let mut profile = store
        .find_profile(id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    if let Some(score) = req.credit_score {
        if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return Err(AppError::Validation(format!(
                "credit_score must be within [{}, {}]",
                SCORE_MIN, SCORE_MAX
            )));
        }
        profile = store
            .update_profile_score(id, score, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;
    }
    if let Some(status) = req.status {
        profile = store
            .set_profile_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;
    }
    if let Some(fraud_alert) = req.fraud_alert {
        profile = store
            .set_fraud_alert(id, fraud_alert)
            .await?
            .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;
    }

    Ok(Json(profile))
}

/// POST /api/v1/profiles/:id/recalculate
pub async fn recalculate_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    require_admin(actor)?;
    tracing::info!(profile_id = %id, "POST /profiles/recalculate");

    recalc::recalculate(&state.store(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))
}

// ============ Accounts ============

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub profile_id: Uuid,
    pub account_type: AccountType,
    pub lender_name: String,
    pub account_number: String,
    pub open_date: DateTime<Utc>,
    pub credit_limit: Option<f64>,
    pub current_balance: f64,
    pub original_amount: Option<f64>,
}

fn validate_account_shape(
    account_type: AccountType,
    credit_limit: Option<f64>,
    original_amount: Option<f64>,
    current_balance: f64,
) -> Result<(), AppError> {
    match (account_type, credit_limit) {
        (AccountType::CreditCard, None) => {
            return Err(AppError::Validation(
                "credit_limit is required for credit card accounts".to_string(),
            ))
        }
        (AccountType::CreditCard, Some(limit)) if limit < 0.0 => {
            return Err(AppError::Validation(
                "credit_limit must not be negative".to_string(),
            ))
        }
        (t, Some(_)) if t != AccountType::CreditCard => {
            return Err(AppError::Validation(
                "credit_limit is only valid for credit card accounts".to_string(),
            ))
        }
        _ => {}
    }

    if account_type.is_installment() && original_amount.is_none() {
        return Err(AppError::Validation(
            "original_amount is required for installment accounts".to_string(),
        ));
    }
    if !account_type.is_installment() && original_amount.is_some() {
        return Err(AppError::Validation(
            "original_amount is only valid for installment accounts".to_string(),
        ));
    }
    if current_balance < 0.0 {
        return Err(AppError::Validation(
            "current_balance must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/accounts
///
/// A lender reports a new credit instrument against a profile; the score is
/// recalculated afterwards.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    if actor.role != ActorRole::Lender {
        return Err(AppError::Forbidden(
            "only a lender may report accounts".to_string(),
        ));
    }
    tracing::info!(profile_id = %req.profile_id, "POST /accounts");

    validate_account_shape(
        req.account_type,
        req.credit_limit,
        req.original_amount,
        req.current_balance,
    )?;
    if req.account_number.trim().is_empty() {
        return Err(AppError::Validation(
            "account_number is required".to_string(),
        ));
    }
    if req.lender_name.trim().is_empty() {
        return Err(AppError::Validation("lender_name is required".to_string()));
    }

    let store = state.store();
    store
        .find_profile(req.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    let now = Utc::now();
    let account = Account {
        id: Uuid::new_v4(),
        profile_id: req.profile_id,
        account_type: req.account_type,
        lender_id: actor.id,
        lender_name: req.lender_name,
        account_number: req.account_number,
        open_date: req.open_date,
        close_date: None,
        credit_limit: req.credit_limit,
        current_balance: req.current_balance,
        original_amount: req.original_amount,
        payment_history: Vec::new(),
        status: AccountStatus::Current,
        last_report_date: now,
        created_at: now,
    };
    store.insert_account(&account).await?;
    recalc::recalculate(&store, account.profile_id).await?;

    tracing::info!(account_id = %account.id, "account reported");
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountUpdateRequest {
    pub current_balance: Option<f64>,
    pub credit_limit: Option<f64>,
    pub close_date: Option<DateTime<Utc>>,
}

/// Loads an account the actor may mutate: the reporting lender or an admin.
async fn load_reported_account(
    store: &BureauStore,
    account_id: Uuid,
    actor: Actor,
) -> Result<Account, AppError> {
    let account = store
        .find_account(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    if !actor.is_admin() && (actor.role != ActorRole::Lender || account.lender_id != actor.id) {
        return Err(AppError::Forbidden(
            "account is not reported by you".to_string(),
        ));
    }
    Ok(account)
}

/// PATCH /api/v1/accounts/:id
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<AccountUpdateRequest>,
) -> Result<Json<Account>, AppError> {
    tracing::info!(account_id = %id, "PATCH /accounts");

    let store = state.store();
    let mut account = load_reported_account(&store, id, actor).await?;

    if let Some(balance) = req.current_balance {
        if balance < 0.0 {
            return Err(AppError::Validation(
                "current_balance must not be negative".to_string(),
            ));
        }
        account.current_balance = balance;
    }
    if let Some(limit) = req.credit_limit {
        if account.account_type != AccountType::CreditCard {
            return Err(AppError::Validation(
                "credit_limit is only valid for credit card accounts".to_string(),
            ));
        }
        if limit < 0.0 {
            return Err(AppError::Validation(
                "credit_limit must not be negative".to_string(),
            ));
        }
        account.credit_limit = Some(limit);
    }
    if let Some(close_date) = req.close_date {
        account.close_date = Some(close_date);
    }

    let now = Utc::now();
    account.refresh_status(now);

    // Only the changed scalar fields are written; the embedded payment
    // history stays untouched even if another report raced this update.
    let updated = store
        .update_account_terms(
            id,
            account.current_balance,
            account.credit_limit,
            account.close_date,
            account.status,
            now,
        )
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;
    recalc::recalculate(&store, updated.profile_id).await?;

    Ok(Json(updated))
}

/// DELETE /api/v1/accounts/:id
///
/// Removal changes the record set, so the score is recalculated.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tracing::info!(account_id = %id, "DELETE /accounts");

    let store = state.store();
    let account = load_reported_account(&store, id, actor).await?;

    if !store.delete_account(id).await? {
        return Err(AppError::NotFound("account not found".to_string()));
    }
    recalc::recalculate(&store, account.profile_id).await?;

    tracing::info!(account_id = %id, profile_id = %account.profile_id, "account removed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReportPaymentRequest {
    pub due_date: DateTime<Utc>,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub date_paid: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
}

/// POST /api/v1/accounts/:id/payments
///
/// Appends one payment entry; the account status is re-derived in the same
/// store statement, then the profile score is recalculated.
pub async fn report_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ReportPaymentRequest>,
) -> Result<Json<Account>, AppError> {
    tracing::info!(account_id = %id, "POST /accounts/payments");

    if req.amount_due < 0.0 || req.amount_paid < 0.0 {
        return Err(AppError::Validation(
            "payment amounts must not be negative".to_string(),
        ));
    }

    let store = state.store();
    let mut account = load_reported_account(&store, id, actor).await?;

    let now = Utc::now();
    let entry = PaymentEntry {
        due_date: req.due_date,
        amount_due: req.amount_due,
        amount_paid: req.amount_paid,
        date_paid: req.date_paid,
        status: req.status,
        reported_at: now,
    };

    // Derive the post-append status locally so append + status flip land in
    // one statement.
    account.payment_history.push(entry.clone());
    let new_status = account.derived_status(now);

    let updated = store
        .append_payment(id, &entry, new_status, now)
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;
    recalc::recalculate(&store, updated.profile_id).await?;

    Ok(Json(updated))
}

// ============ Inquiries ============

/// Default inquiry lifetime: two years.
const INQUIRY_TTL_DAYS: i64 = 730;

#[derive(Debug, Deserialize)]
pub struct CreateInquiryRequest {
    pub profile_id: Uuid,
    pub inquiry_type: InquiryType,
    pub inquiry_purpose: InquiryPurpose,
    pub inquiring_entity_name: String,
}

/// POST /api/v1/inquiries
///
/// Records a credit check. A frozen profile rejects hard inquiries; soft
/// ones pass through and never touch the score.
pub async fn create_inquiry(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), AppError> {
    if actor.role != ActorRole::Lender {
        return Err(AppError::Forbidden(
            "only a lender may record inquiries".to_string(),
        ));
    }
    tracing::info!(profile_id = %req.profile_id, "POST /inquiries");

    if req.inquiring_entity_name.trim().is_empty() {
        return Err(AppError::Validation(
            "inquiring_entity_name is required".to_string(),
        ));
    }

    let store = state.store();
    let profile = store
        .find_profile(req.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    if !profile.accepts_inquiries() {
        return Err(AppError::Forbidden(
            "this credit profile is frozen and cannot be accessed".to_string(),
        ));
    }

    let now = Utc::now();
    let inquiry = Inquiry {
        id: Uuid::new_v4(),
        profile_id: req.profile_id,
        inquiring_entity: InquiringEntity {
            id: actor.id,
            name: req.inquiring_entity_name,
        },
        inquiry_type: req.inquiry_type,
        inquiry_purpose: req.inquiry_purpose,
        inquiry_date: now,
        expires_at: now + Duration::days(INQUIRY_TTL_DAYS),
        created_at: now,
    };
    store.insert_inquiry(&inquiry).await?;

    if inquiry.inquiry_type == InquiryType::Hard {
        recalc::recalculate(&store, inquiry.profile_id).await?;
    }

    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// DELETE /api/v1/inquiries/:id
///
/// Administrative correction of an erroneous inquiry. Recalculates only
/// when a hard inquiry was actually removed.
pub async fn delete_inquiry(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(actor)?;
    tracing::info!(inquiry_id = %id, "DELETE /inquiries");

    let store = state.store();
    let removed = store
        .delete_inquiry(id)
        .await?
        .ok_or_else(|| AppError::NotFound("inquiry not found".to_string()))?;

    if removed.inquiry_type == InquiryType::Hard {
        recalc::recalculate(&store, removed.profile_id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============ Public records ============

#[derive(Debug, Deserialize)]
pub struct CreatePublicRecordRequest {
    pub profile_id: Uuid,
    pub record_type: PublicRecordType,
    pub case_number: String,
    pub court_name: String,
    pub filed_date: DateTime<Utc>,
    pub liability_amount: Option<f64>,
    pub expires_from_record: DateTime<Utc>,
    pub reported_by: String,
}

/// POST /api/v1/public-records
pub async fn create_public_record(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreatePublicRecordRequest>,
) -> Result<(StatusCode, Json<PublicRecord>), AppError> {
    require_admin(actor)?;
    tracing::info!(profile_id = %req.profile_id, "POST /public-records");

    if req.record_type.requires_liability() && req.liability_amount.is_none() {
        return Err(AppError::Validation(
            "liability_amount is required for tax lien, judgment and civil suit records"
                .to_string(),
        ));
    }
    if req.case_number.trim().is_empty() || req.court_name.trim().is_empty() {
        return Err(AppError::Validation(
            "case_number and court_name are required".to_string(),
        ));
    }

    let store = state.store();
    store
        .find_profile(req.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    let record = PublicRecord {
        id: Uuid::new_v4(),
        profile_id: req.profile_id,
        record_type: req.record_type,
        case_number: req.case_number,
        court_name: req.court_name,
        filed_date: req.filed_date,
        status: PublicRecordStatus::Filed,
        resolved_date: None,
        liability_amount: req.liability_amount,
        expires_from_record: req.expires_from_record,
        reported_by: req.reported_by,
        created_at: Utc::now(),
    };
    store.insert_public_record(&record).await?;
    recalc::recalculate(&store, record.profile_id).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicRecordUpdateRequest {
    pub status: Option<PublicRecordStatus>,
    pub resolved_date: Option<DateTime<Utc>>,
    pub liability_amount: Option<f64>,
}

/// PATCH /api/v1/public-records/:id
///
/// Status changes matter to scoring (a discharged bankruptcy stops
/// penalizing), so every update recalculates.
pub async fn update_public_record(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<PublicRecordUpdateRequest>,
) -> Result<Json<PublicRecord>, AppError> {
    require_admin(actor)?;
    tracing::info!(record_id = %id, "PATCH /public-records");

    let store = state.store();
    let mut record = store
        .find_public_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound("public record not found".to_string()))?;

    if let Some(status) = req.status {
        record.status = status;
        if record.is_resolved() && record.resolved_date.is_none() {
            record.resolved_date = Some(Utc::now());
        }
    }
    if let Some(resolved_date) = req.resolved_date {
        record.resolved_date = Some(resolved_date);
    }
    if let Some(amount) = req.liability_amount {
        record.liability_amount = Some(amount);
    }

    store.update_public_record(&record).await?;
    recalc::recalculate(&store, record.profile_id).await?;

    Ok(Json(record))
}

// ============ Collections ============

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub profile_id: Uuid,
    pub original_account_id: Option<Uuid>,
    pub collection_agency: String,
    pub original_creditor: String,
    pub original_amount: f64,
    pub current_amount: f64,
    pub collection_date: DateTime<Utc>,
    pub expires_from_record: DateTime<Utc>,
}

/// POST /api/v1/collections
///
/// Collections surface in report snapshots but do not feed the scoring
/// engine, so no recalculation follows.
pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), AppError> {
    if actor.role == ActorRole::Consumer {
        return Err(AppError::Forbidden(
            "consumers may not report collections".to_string(),
        ));
    }
    tracing::info!(profile_id = %req.profile_id, "POST /collections");

    if req.original_amount < 0.0 || req.current_amount < 0.0 {
        return Err(AppError::Validation(
            "collection amounts must not be negative".to_string(),
        ));
    }

    let store = state.store();
    store
        .find_profile(req.profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("credit profile not found".to_string()))?;

    let now = Utc::now();
    let collection = Collection {
        id: Uuid::new_v4(),
        profile_id: req.profile_id,
        original_account_id: req.original_account_id,
        collection_agency: req.collection_agency,
        original_creditor: req.original_creditor,
        original_amount: req.original_amount,
        current_amount: req.current_amount,
        collection_date: req.collection_date,
        status: CollectionStatus::Active,
        last_activity_date: now,
        expires_from_record: req.expires_from_record,
        created_at: now,
    };
    store.insert_collection(&collection).await?;

    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/v1/profiles/:id/collections
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Collection>>, AppError> {
    let store = state.store();
    load_owned_profile(&store, id, actor).await?;
    Ok(Json(store.list_collections(id).await?))
}

// ============ Disputes ============

#[derive(Debug, Deserialize)]
pub struct CreateDisputeRequest {
    pub account_id: Uuid,
    pub reason: DisputeReason,
    pub description: String,
    #[serde(default)]
    pub supporting_documents: Vec<String>,
    #[serde(default)]
    pub affected_items: Vec<AffectedItem>,
}

/// POST /api/v1/disputes
pub async fn create_dispute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateDisputeRequest>,
) -> Result<(StatusCode, Json<Dispute>), AppError> {
    if actor.role != ActorRole::Consumer {
        return Err(AppError::Forbidden(
            "only a consumer may open a dispute".to_string(),
        ));
    }
    tracing::info!(account_id = %req.account_id, "POST /disputes");

    let dispute = disputes::create_dispute(
        &state.store(),
        req.account_id,
        actor.id,
        req.reason,
        req.description,
        req.supporting_documents,
        req.affected_items,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(dispute)))
}

/// PATCH /api/v1/disputes/:id
pub async fn update_dispute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<ConsumerUpdate>,
) -> Result<Json<Dispute>, AppError> {
    tracing::info!(dispute_id = %id, "PATCH /disputes");

    let dispute = disputes::transition_dispute(
        &state.store(),
        id,
        actor.id,
        actor.role,
        DisputeCommand::Update(changes),
    )
    .await?;
    Ok(Json(dispute))
}

#[derive(Debug, Deserialize)]
pub struct DisputeResponseRequest {
    pub response: String,
}

/// POST /api/v1/disputes/:id/respond
pub async fn respond_to_dispute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<DisputeResponseRequest>,
) -> Result<Json<Dispute>, AppError> {
    tracing::info!(dispute_id = %id, "POST /disputes/respond");

    if req.response.trim().is_empty() {
        return Err(AppError::Validation("response is required".to_string()));
    }

    let dispute = disputes::transition_dispute(
        &state.store(),
        id,
        actor.id,
        actor.role,
        DisputeCommand::Respond {
            response: req.response,
        },
    )
    .await?;
    Ok(Json(dispute))
}

/// POST /api/v1/disputes/:id/cancel
pub async fn cancel_dispute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Dispute>, AppError> {
    tracing::info!(dispute_id = %id, "POST /disputes/cancel");

    let dispute = disputes::transition_dispute(
        &state.store(),
        id,
        actor.id,
        actor.role,
        DisputeCommand::Cancel,
    )
    .await?;
    Ok(Json(dispute))
}

#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    pub outcome: ResolutionOutcome,
    pub resolution: String,
}

/// POST /api/v1/disputes/:id/resolve
pub async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveDisputeRequest>,
) -> Result<Json<Dispute>, AppError> {
    tracing::info!(dispute_id = %id, "POST /disputes/resolve");

    if req.resolution.trim().is_empty() {
        return Err(AppError::Validation("resolution is required".to_string()));
    }

    let dispute = disputes::transition_dispute(
        &state.store(),
        id,
        actor.id,
        actor.role,
        DisputeCommand::Resolve {
            outcome: req.outcome,
            resolution: req.resolution,
        },
    )
    .await?;
    Ok(Json(dispute))
}

// ============ Reports ============

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub report_type: ReportType,
}

/// POST /api/v1/reports
///
/// Consumer self-service generation against their own profile.
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    headers: HeaderMap,
    Json(req): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    if actor.role != ActorRole::Consumer {
        return Err(AppError::Forbidden(
            "only a consumer may self-generate a report".to_string(),
        ));
    }
    tracing::info!(actor_id = %actor.id, "POST /reports");

    let profile = resolve_own_profile(&state, actor).await?;
    let report = reports::generate_report(
        &state.store(),
        profile.id,
        actor.id,
        req.report_type,
        client_origin(&headers),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Deserialize)]
pub struct RequestReportRequest {
    pub profile_id: Uuid,
    pub report_type: ReportType,
    pub requester_name: String,
}

/// POST /api/v1/reports/request
///
/// Lender flow; records a hard credit-check inquiry as a side effect.
pub async fn request_report(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    headers: HeaderMap,
    Json(req): Json<RequestReportRequest>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    if actor.role != ActorRole::Lender {
        return Err(AppError::Forbidden(
            "only a lender may request a report".to_string(),
        ));
    }
    tracing::info!(profile_id = %req.profile_id, "POST /reports/request");

    if req.requester_name.trim().is_empty() {
        return Err(AppError::Validation(
            "requester_name is required".to_string(),
        ));
    }

    let report = reports::request_report(
        &state.store(),
        req.profile_id,
        actor.id,
        req.requester_name,
        req.report_type,
        client_origin(&headers),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/v1/reports/token/:token
pub async fn fetch_report_by_token(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<Report>, AppError> {
    let report = reports::fetch_report_by_token(
        &state.store(),
        &token,
        actor.id,
        client_origin(&headers),
    )
    .await?;
    Ok(Json(report))
}

// ============ Score preview ============

/// GET /api/v1/profiles/:id/score
///
/// Read-only derivation from the live record set; nothing is persisted, so
/// a preview can differ from the stored score until the next mutation.
pub async fn preview_score(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = state.store();
    let profile = load_owned_profile(&store, id, actor).await?;

    let accounts = store.list_accounts(id).await?;
    let inquiries = store.list_inquiries(id).await?;
    let public_records = store.list_public_records(id).await?;

    let score = compute_score(&accounts, &inquiries, &public_records, Utc::now());
    Ok(Json(json!({
        "profile_id": profile.id,
        "stored_score": profile.credit_score,
        "computed_score": score,
        "score_category": score_category(score),
    })))
}
