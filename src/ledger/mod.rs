//! Points ledger.
//!
//! The ledger is the source of truth for a user's balance. Every mutation is
//! an appended entry keyed by `(employee_id, reason, reference_id)`; the
//! cached `users.total_points` column is recomputed from the entry sum on each
//! append and written in the same transaction.
//!
//! All functions take a connection that the caller has already placed inside
//! a transaction (see [`crate::storage::begin_immediate`]).

use std::fmt;
use std::str::FromStr;

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{Result, RewardError};
use crate::storage::sqlite::{ledger as store, users};

/// Why points moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerReason {
    Visit,
    Evaluation,
    Mission,
    GachaSpend,
    BoothEntrySpend,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::Visit => "VISIT",
            LedgerReason::Evaluation => "EVALUATION",
            LedgerReason::Mission => "MISSION",
            LedgerReason::GachaSpend => "GACHA_SPEND",
            LedgerReason::BoothEntrySpend => "BOOTH_ENTRY_SPEND",
        }
    }
}

impl fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "VISIT" => Ok(LedgerReason::Visit),
            "EVALUATION" => Ok(LedgerReason::Evaluation),
            "MISSION" => Ok(LedgerReason::Mission),
            "GACHA_SPEND" => Ok(LedgerReason::GachaSpend),
            "BOOTH_ENTRY_SPEND" => Ok(LedgerReason::BoothEntrySpend),
            other => Err(format!("unknown ledger reason {other:?}")),
        }
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub entry_id: i64,
    pub employee_id: String,
    pub delta: i64,
    pub reason: LedgerReason,
    pub reference_id: String,
    pub created_at: String,
}

/// Result of [`append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Balance after the call.
    pub balance: i64,
    /// False when the reference was already recorded and nothing changed.
    pub applied: bool,
}

/// Cached balance compared against the ledger sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAudit {
    pub employee_id: String,
    pub cached: i64,
    pub ledger_sum: i64,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.cached == self.ledger_sum
    }
}

/// Append a signed delta for `employee_id`.
///
/// A reference already recorded for the same reason is a no-op returning the
/// current balance. A debit that would take the balance below zero fails with
/// `InsufficientBalance` and writes nothing.
pub async fn append(
    conn: &mut SqliteConnection,
    employee_id: &str,
    delta: i64,
    reason: LedgerReason,
    reference_id: &str,
) -> Result<AppendOutcome> {
    if delta == 0 {
        return Err(RewardError::Validation(
            "ledger delta must be non-zero".to_string(),
        ));
    }
    if reference_id.is_empty() {
        return Err(RewardError::Validation(
            "ledger reference must not be empty".to_string(),
        ));
    }
    if users::find(conn, employee_id).await?.is_none() {
        return Err(RewardError::UnknownUser(employee_id.to_string()));
    }

    let current = store::sum_deltas(conn, employee_id).await?;

    if store::find_entry(conn, employee_id, reason, reference_id)
        .await?
        .is_some()
    {
        debug!(
            employee_id,
            %reason,
            reference_id,
            "ledger reference already applied"
        );
        return Ok(AppendOutcome {
            balance: current,
            applied: false,
        });
    }

    if delta < 0 && current + delta < 0 {
        return Err(RewardError::InsufficientBalance {
            required: -delta,
            available: current,
        });
    }

    store::insert_entry(conn, employee_id, delta, reason, reference_id).await?;
    let balance = store::sum_deltas(conn, employee_id).await?;
    users::set_total_points(conn, employee_id, balance).await?;

    debug!(employee_id, delta, %reason, reference_id, balance, "ledger entry appended");

    Ok(AppendOutcome {
        balance,
        applied: true,
    })
}

/// Current balance as the sum of all entries.
pub async fn balance(conn: &mut SqliteConnection, employee_id: &str) -> Result<i64> {
    Ok(store::sum_deltas(conn, employee_id).await?)
}

/// Entries for a user, oldest first.
pub async fn entries(conn: &mut SqliteConnection, employee_id: &str) -> Result<Vec<LedgerEntry>> {
    Ok(store::list_entries(conn, employee_id).await?)
}

/// Compare the cached balance with the entry sum.
pub async fn audit(conn: &mut SqliteConnection, employee_id: &str) -> Result<BalanceAudit> {
    let user = users::find(conn, employee_id)
        .await?
        .ok_or_else(|| RewardError::UnknownUser(employee_id.to_string()))?;
    let ledger_sum = store::sum_deltas(conn, employee_id).await?;
    Ok(BalanceAudit {
        employee_id: user.employee_id,
        cached: user.total_points,
        ledger_sum,
    })
}

#[cfg(test)]
mod tests;
