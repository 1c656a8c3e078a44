//! Gacha draw.
//!
//! A draw spends a fixed number of points and awards one prize. The prize is
//! picked at random weighted by remaining stock, so a prize that is close to
//! selling out becomes proportionally rarer and a sold-out prize is never
//! drawn.
//!
//! [`GachaDraw::attempt`] must run inside a write transaction: the attempt
//! count, balance and stock reads and the three writes (stock decrement,
//! attempt row, ledger debit) commit or roll back together.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::config::GachaConfig;
use crate::error::{Result, RewardError};
use crate::ledger::{self, LedgerReason};
use crate::storage::sqlite::goods as store;
use crate::storage::StorageError;

/// A prize and its stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoodsStock {
    pub goods_id: String,
    pub name: String,
    pub total_stock: i64,
    pub remaining_stock: i64,
}

impl GoodsStock {
    /// A fully stocked prize.
    pub fn new(goods_id: impl Into<String>, name: impl Into<String>, total_stock: i64) -> Self {
        Self {
            goods_id: goods_id.into(),
            name: name.into(),
            total_stock,
            remaining_stock: total_stock,
        }
    }

    pub fn has_stock(&self) -> bool {
        self.remaining_stock > 0
    }
}

/// A recorded draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GachaAttempt {
    pub attempt_id: i64,
    pub employee_id: String,
    /// 1-based position among the user's draws, for "1/2" style display.
    pub attempt_number: i64,
    pub goods_id: String,
    pub goods_name: String,
    pub points_spent: i64,
    pub created_at: String,
}

/// What a successful draw returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GachaResult {
    pub goods_id: String,
    pub goods_name: String,
    pub remaining_points: i64,
    pub attempt_number: i64,
}

/// Sum of remaining stock over prizes that still have some.
pub fn total_remaining(stock: &[GoodsStock]) -> u64 {
    stock
        .iter()
        .filter(|g| g.has_stock())
        .map(|g| g.remaining_stock as u64)
        .sum()
}

/// Map a roll in `[0, total_remaining)` onto a prize.
///
/// Prizes occupy consecutive intervals sized by their remaining stock, in
/// slice order. Returns `None` when the roll is out of range.
pub fn pick_weighted(stock: &[GoodsStock], roll: u64) -> Option<&GoodsStock> {
    let mut upper = 0u64;
    for goods in stock.iter().filter(|g| g.has_stock()) {
        upper += goods.remaining_stock as u64;
        if roll < upper {
            return Some(goods);
        }
    }
    None
}

/// Executes draws against the store.
pub struct GachaDraw {
    cost: i64,
    max_attempts: i64,
    rng: Mutex<StdRng>,
}

impl GachaDraw {
    pub fn new(config: &GachaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            cost: config.cost,
            max_attempts: config.max_attempts,
            rng: Mutex::new(rng),
        }
    }

    fn roll(&self, total: u64) -> u64 {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.random_range(0..total)
    }

    /// Spend `cost` points and award one prize.
    ///
    /// Checks, in order: attempt limit, balance, stock. Losing a race for the
    /// chosen prize's last unit is reported as `ConcurrencyConflict` so the
    /// caller can retry against fresh stock.
    pub async fn attempt(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
    ) -> Result<GachaResult> {
        let prior = store::count_attempts(conn, employee_id).await?;
        if prior >= self.max_attempts {
            info!(employee_id, prior, "gacha attempt limit reached");
            return Err(RewardError::AttemptLimitExceeded {
                limit: self.max_attempts,
            });
        }

        let balance = ledger::balance(conn, employee_id).await?;
        if balance < self.cost {
            info!(employee_id, balance, cost = self.cost, "gacha rejected, balance too low");
            return Err(RewardError::InsufficientBalance {
                required: self.cost,
                available: balance,
            });
        }

        let stock = store::list_available(conn).await?;
        let total = total_remaining(&stock);
        if total == 0 {
            info!(employee_id, "gacha rejected, no stock left");
            return Err(RewardError::OutOfStock);
        }

        let roll = self.roll(total);
        let prize = pick_weighted(&stock, roll).ok_or(RewardError::OutOfStock)?;
        debug!(employee_id, roll, total, goods_id = %prize.goods_id, "gacha prize selected");

        if !store::decrement_stock(conn, &prize.goods_id).await? {
            return Err(RewardError::ConcurrencyConflict(format!(
                "stock for {} changed during draw",
                prize.goods_id
            )));
        }

        let attempt_number = prior + 1;
        let spend = ledger::append(
            conn,
            employee_id,
            -self.cost,
            LedgerReason::GachaSpend,
            &attempt_number.to_string(),
        )
        .await?;
        if !spend.applied {
            return Err(StorageError::Corrupt {
                table: "ledger_entries",
                detail: format!(
                    "gacha spend for attempt {attempt_number} of {employee_id} exists without its attempt"
                ),
            }
            .into());
        }

        store::insert_attempt(conn, employee_id, attempt_number, &prize.goods_id, self.cost)
            .await?;

        info!(
            employee_id,
            attempt_number,
            goods_id = %prize.goods_id,
            remaining_points = spend.balance,
            "gacha prize awarded"
        );

        Ok(GachaResult {
            goods_id: prize.goods_id.clone(),
            goods_name: prize.name.clone(),
            remaining_points: spend.balance,
            attempt_number,
        })
    }

    /// A user's draws, newest first.
    pub async fn history(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
    ) -> Result<Vec<GachaAttempt>> {
        Ok(store::list_attempts(conn, employee_id).await?)
    }
}

#[cfg(test)]
mod tests;
