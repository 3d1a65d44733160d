//! The scoring engine.
//!
//! `compute_score` is a pure function over a full snapshot of a profile's
//! accounts, inquiries and public records. It always rebuilds from the fixed
//! base of 700 rather than adjusting the prior score incrementally, which
//! makes it idempotent with respect to the current record set regardless of
//! the order mutations arrived in.

use crate::models::{
    Account, AccountStatus, AccountType, Inquiry, InquiryType, PublicRecord, PublicRecordStatus,
    PublicRecordType, SCORE_BASE, SCORE_MAX, SCORE_MIN,
};
use chrono::{DateTime, Utc};

/// Points removed per late or defaulted payment entry.
const LATE_PAYMENT_PENALTY: i32 = 15;
/// Points removed per hard inquiry inside the trailing window.
const HARD_INQUIRY_PENALTY: i32 = 5;
/// Points removed per undischarged bankruptcy.
const BANKRUPTCY_PENALTY: i32 = 100;
/// Inquiry recency window, in 30-day months. The boundary is inclusive.
const INQUIRY_WINDOW_MONTHS: f64 = 12.0;

/// Derives a credit score from the profile's current record set.
///
/// Applied in order: payment history, revolving utilization, credit history
/// length, recent hard inquiries, public records; the result is clamped to
/// [300, 850]. An empty account list contributes neither payment penalties
/// nor a history-length bonus.
pub fn compute_score(
    accounts: &[Account],
    inquiries: &[Inquiry],
    public_records: &[PublicRecord],
    now: DateTime<Utc>,
) -> i32 {
    let mut score = SCORE_BASE;

    // Payment history: every late_* or default entry costs points, uncapped.
    let late_payments: i32 = accounts
        .iter()
        .flat_map(|a| a.payment_history.iter())
        .filter(|p| p.status.is_derogatory())
        .count() as i32;
    score -= late_payments * LATE_PAYMENT_PENALTY;

    // Utilization across open credit cards. Skipped entirely when there are
    // none; a zero aggregate limit yields an infinite ratio and lands in the
    // worst bucket, matching the original arithmetic.
    let open_cards: Vec<&Account> = accounts
        .iter()
        .filter(|a| a.account_type == AccountType::CreditCard && a.status != AccountStatus::Closed)
        .collect();
    if !open_cards.is_empty() {
        let total_limit: f64 = open_cards.iter().filter_map(|a| a.credit_limit).sum();
        let total_balance: f64 = open_cards.iter().map(|a| a.current_balance).sum();
        let ratio = if total_limit > 0.0 {
            total_balance / total_limit
        } else {
            f64::INFINITY
        };
        score += utilization_adjustment(ratio);
    }

    // Length of credit history, from the earliest open date. With no
    // accounts the fold start ("now") yields zero years and no bonus.
    let earliest_open = accounts.iter().fold(now, |oldest, a| {
        if a.open_date < oldest {
            a.open_date
        } else {
            oldest
        }
    });
    let history_years = (now - earliest_open).num_seconds() as f64 / (365.0 * 86_400.0);
    score += history_length_bonus(history_years);

    // Hard inquiries inside the trailing 12 months, by date filtering only.
    let recent_hard = inquiries
        .iter()
        .filter(|i| i.inquiry_type == InquiryType::Hard)
        .filter(|i| {
            let months_ago = (now - i.inquiry_date).num_seconds() as f64 / (30.0 * 86_400.0);
            months_ago <= INQUIRY_WINDOW_MONTHS
        })
        .count() as i32;
    score -= recent_hard * HARD_INQUIRY_PENALTY;

    // Undischarged bankruptcies carry the severe penalty.
    let bankruptcies = public_records
        .iter()
        .filter(|r| {
            r.record_type == PublicRecordType::Bankruptcy
                && r.status != PublicRecordStatus::Discharged
        })
        .count() as i32;
    score -= bankruptcies * BANKRUPTCY_PENALTY;

    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Bucketed adjustment for the aggregate balance-to-limit ratio.
///
/// Boundaries are inclusive of the lower branch: a ratio of exactly 0.1
/// falls into the `< 0.3` bucket.
fn utilization_adjustment(ratio: f64) -> i32 {
    if ratio < 0.1 {
        50
    } else if ratio < 0.3 {
        30
    } else if ratio < 0.5 {
        0
    } else if ratio < 0.7 {
        -30
    } else {
        -50
    }
}

/// Bonus for the age of the oldest account, with strict year thresholds.
fn history_length_bonus(years: f64) -> i32 {
    if years > 7.0 {
        40
    } else if years > 5.0 {
        30
    } else if years > 3.0 {
        20
    } else if years > 1.0 {
        10
    } else {
        0
    }
}
