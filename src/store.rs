//! Record store client.
//!
//! Entities are persisted as JSONB documents keyed by typed UUID columns
//! (see `schema.sql`). Embedded logs — payment history, score history,
//! dispute history, access log — live inside the document and are only ever
//! grown through single-statement `||` appends, which is what makes each
//! append all-or-nothing. Every method here is one statement, so a single
//! entity mutation is atomic in isolation.

use crate::errors::AppError;
use crate::models::{
    AccessEntry, Account, AccountStatus, Collection, Dispute, DisputeEvent, Inquiry, PaymentEntry,
    Profile, ProfileStatus, PublicRecord, Report,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Storage service for bureau entities.
pub struct BureauStore {
    pool: PgPool,
}

/// Decode a stored JSONB document into its entity type.
fn decode<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(doc)?)
}

/// Encode an entity into its JSONB document form.
fn encode<T: Serialize>(entity: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(entity).map_err(Into::into)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl BureauStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- profiles ----

    /// Inserts a new profile. Uniqueness on both the consumer reference and
    /// the national identifier is enforced by the store.
    pub async fn insert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO bureau.profiles (id, user_id, national_id, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(&profile.national_id)
        .bind(encode(profile)?)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
                "a profile already exists for this consumer or national id".to_string(),
            )),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    pub async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    /// Persists a score and journals it, in one statement.
    ///
    /// The history entry is appended only when the stored score actually
    /// changes; the rule lives here rather than in the engine so that direct
    /// score writes (admin corrections) are journaled identically.
    pub async fn update_profile_score(
        &self,
        id: Uuid,
        score: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Profile>, AppError> {
        let entry = serde_json::json!({
            "score": score,
            "calculated_at": now,
        });

        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.profiles
            SET doc = CASE
                WHEN (doc->>'credit_score')::int IS DISTINCT FROM $2 THEN
                    jsonb_set(
                        jsonb_set(
                            jsonb_set(doc, '{credit_score}', to_jsonb($2::int)),
                            '{score_history}', (doc->'score_history') || $3::jsonb
                        ),
                        '{last_updated}', $4::jsonb
                    )
                ELSE doc
            END
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(score)
        .bind(entry)
        .bind(serde_json::json!(now))
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn set_profile_status(
        &self,
        id: Uuid,
        status: ProfileStatus,
    ) -> Result<Option<Profile>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.profiles
            SET doc = jsonb_set(doc, '{status}', $2::jsonb)
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(serde_json::json!(status))
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn set_fraud_alert(
        &self,
        id: Uuid,
        fraud_alert: bool,
    ) -> Result<Option<Profile>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.profiles
            SET doc = jsonb_set(doc, '{fraud_alert}', to_jsonb($2::bool))
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(fraud_alert)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    // ---- accounts ----

    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bureau.accounts (id, profile_id, lender_id, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(account.id)
        .bind(account.profile_id)
        .bind(account.lender_id)
        .bind(encode(account)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_account(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn list_accounts(&self, profile_id: Uuid) -> Result<Vec<Account>, AppError> {
        let docs = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.accounts WHERE profile_id = $1 ORDER BY created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(decode).collect()
    }

    /// Updates the reportable scalar fields in one targeted statement.
    ///
    /// Only the named paths are written; the embedded payment history is
    /// never touched here, so a concurrent `append_payment` cannot be
    /// overwritten by a stale read-modify-write.
    pub async fn update_account_terms(
        &self,
        id: Uuid,
        current_balance: f64,
        credit_limit: Option<f64>,
        close_date: Option<DateTime<Utc>>,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.accounts
            SET doc = jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(doc,
                '{current_balance}', $2::jsonb),
                '{credit_limit}', $3::jsonb),
                '{close_date}', $4::jsonb),
                '{status}', $5::jsonb),
                '{last_report_date}', $6::jsonb)
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(serde_json::json!(current_balance))
        .bind(serde_json::json!(credit_limit))
        .bind(serde_json::json!(close_date))
        .bind(serde_json::json!(status))
        .bind(serde_json::json!(now))
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn delete_account(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bureau.accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends a payment entry and re-derives the account status in one
    /// statement, so the history append and the status flip cannot tear.
    pub async fn append_payment(
        &self,
        id: Uuid,
        entry: &PaymentEntry,
        new_status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.accounts
            SET doc = jsonb_set(
                jsonb_set(
                    jsonb_set(doc, '{payment_history}', (doc->'payment_history') || $2::jsonb),
                    '{status}', $3::jsonb
                ),
                '{last_report_date}', $4::jsonb
            )
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(encode(entry)?)
        .bind(serde_json::json!(new_status))
        .bind(serde_json::json!(now))
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    /// Marks the account as freshly reported, used when a dispute resolves
    /// in the consumer's favor.
    pub async fn touch_account_report_date(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bureau.accounts
            SET doc = jsonb_set(doc, '{last_report_date}', $2::jsonb)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(serde_json::json!(now))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- inquiries ----

    pub async fn insert_inquiry(&self, inquiry: &Inquiry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bureau.inquiries (id, profile_id, doc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(inquiry.id)
        .bind(inquiry.profile_id)
        .bind(encode(inquiry)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.inquiries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn list_inquiries(&self, profile_id: Uuid) -> Result<Vec<Inquiry>, AppError> {
        let docs = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.inquiries WHERE profile_id = $1 ORDER BY created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(decode).collect()
    }

    /// Removes an inquiry (administrator only); returns the deleted record
    /// so the caller can decide whether a recalculation is due.
    pub async fn delete_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "DELETE FROM bureau.inquiries WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    // ---- public records ----

    pub async fn insert_public_record(&self, record: &PublicRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bureau.public_records (id, profile_id, doc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(record.id)
        .bind(record.profile_id)
        .bind(encode(record)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_public_record(&self, id: Uuid) -> Result<Option<PublicRecord>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.public_records WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    pub async fn list_public_records(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<PublicRecord>, AppError> {
        let docs = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.public_records WHERE profile_id = $1 ORDER BY created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(decode).collect()
    }

    pub async fn update_public_record(&self, record: &PublicRecord) -> Result<(), AppError> {
        sqlx::query("UPDATE bureau.public_records SET doc = $2 WHERE id = $1")
            .bind(record.id)
            .bind(encode(record)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- collections ----

    pub async fn insert_collection(&self, collection: &Collection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bureau.collections (id, profile_id, doc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection.id)
        .bind(collection.profile_id)
        .bind(encode(collection)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_collections(&self, profile_id: Uuid) -> Result<Vec<Collection>, AppError> {
        let docs = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.collections WHERE profile_id = $1 ORDER BY created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(decode).collect()
    }

    // ---- disputes ----

    pub async fn insert_dispute(&self, dispute: &Dispute) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bureau.disputes (id, profile_id, account_id, lender_id, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(dispute.id)
        .bind(dispute.profile_id)
        .bind(dispute.account_id)
        .bind(dispute.lender_id)
        .bind(encode(dispute)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_dispute(&self, id: Uuid) -> Result<Option<Dispute>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.disputes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    /// Persists a dispute transition: the mutable fields are written via
    /// targeted `jsonb_set` and the new history events are appended with
    /// `||`, so two concurrent transitions can never drop each other's
    /// journal entries.
    pub async fn update_dispute(
        &self,
        dispute: &Dispute,
        new_events: &[DisputeEvent],
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bureau.disputes
            SET doc = jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(jsonb_set(doc,
                '{status}', $2::jsonb),
                '{description}', $3::jsonb),
                '{supporting_documents}', $4::jsonb),
                '{affected_items}', $5::jsonb),
                '{lender_response}', $6::jsonb),
                '{resolution}', $7::jsonb),
                '{resolved_at}', $8::jsonb),
                '{updated_at}', $9::jsonb),
                '{history}', (doc->'history') || $10::jsonb)
            WHERE id = $1
            "#,
        )
        .bind(dispute.id)
        .bind(serde_json::json!(dispute.status))
        .bind(serde_json::json!(dispute.description))
        .bind(encode(&dispute.supporting_documents)?)
        .bind(encode(&dispute.affected_items)?)
        .bind(serde_json::json!(dispute.lender_response))
        .bind(serde_json::json!(dispute.resolution))
        .bind(serde_json::json!(dispute.resolved_at))
        .bind(serde_json::json!(dispute.updated_at))
        .bind(encode(&new_events)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of disputes still pending or investigating for a profile;
    /// drives the `disputed` profile status.
    pub async fn count_open_disputes(&self, profile_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT count(*) FROM bureau.disputes
            WHERE profile_id = $1 AND doc->>'status' IN ('pending', 'investigating')
            "#,
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ---- reports ----

    /// Inserts a report. Returns `Ok(false)` when the access token collides
    /// with an existing one so the caller can regenerate and retry; the
    /// uniqueness is enforced by the storage layer, never assumed.
    pub async fn insert_report(&self, report: &Report) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO bureau.reports (id, profile_id, requested_by, access_token, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(report.id)
        .bind(report.profile_id)
        .bind(report.requested_by)
        .bind(&report.access_token)
        .bind(encode(report)?)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    pub async fn find_report_by_token(&self, token: &str) -> Result<Option<Report>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM bureau.reports WHERE access_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }

    /// Appends to the access log; the snapshot itself is never touched.
    pub async fn append_report_access(
        &self,
        id: Uuid,
        entry: &AccessEntry,
    ) -> Result<Option<Report>, AppError> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            UPDATE bureau.reports
            SET doc = jsonb_set(doc, '{access_log}', (doc->'access_log') || $2::jsonb)
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(encode(entry)?)
        .fetch_optional(&self.pool)
        .await?;

        doc.map(decode).transpose()
    }
}
