//! Reward engine.
//!
//! One entry point per user action. Each write runs in its own `BEGIN
//! IMMEDIATE` transaction: preconditions are checked, the ledger is mutated
//! and the mission tracker reacts, all before commit. Any error rolls the
//! whole action back.
//!
//! Repeated actions are keyed on a natural reference (the booth for visits
//! and evaluations, the attempt number for draws, the caller's request key
//! for booth entry) and come back as duplicate outcomes rather than errors.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{info, warn};

use crate::booths::{Booth, EvaluationScores, Visit};
use crate::config::{Config, GachaConfig, RewardsConfig};
use crate::error::{Result, RewardError};
use crate::gacha::{GachaAttempt, GachaDraw, GachaResult, GoodsStock};
use crate::ledger::{self, BalanceAudit, LedgerEntry, LedgerReason};
use crate::missions::{
    MissionCatalog, MissionEvent, MissionTracker, MissionView, TrackerReport, UserMission,
};
use crate::storage::sqlite::{booths, goods, users};
use crate::storage::{self, now};
use crate::users::{Role, User};
use crate::utils::retry::gacha_backoff;

/// Result of a booth check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    /// Zero for a repeat scan.
    pub points_earned: i64,
    pub balance: i64,
    pub duplicate: bool,
    pub missions: TrackerReport,
}

/// Result of a booth evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub points_earned: i64,
    pub balance: i64,
    pub duplicate: bool,
    pub missions: TrackerReport,
}

/// Result of a point spend outside the gacha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendOutcome {
    pub balance: i64,
    /// False when the request key had already been charged.
    pub applied: bool,
}

pub struct RewardEngine {
    pool: SqlitePool,
    rewards: RewardsConfig,
    gacha_config: GachaConfig,
    gacha: GachaDraw,
    missions: MissionTracker,
}

impl RewardEngine {
    /// Engine over an initialized pool with the default mission catalog.
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self::with_catalog(pool, config, MissionCatalog::default())
    }

    pub fn with_catalog(pool: SqlitePool, config: &Config, catalog: MissionCatalog) -> Self {
        Self {
            pool,
            rewards: config.rewards.clone(),
            gacha_config: config.gacha.clone(),
            gacha: GachaDraw::new(&config.gacha),
            missions: MissionTracker::new(Arc::new(catalog)),
        }
    }

    /// Open storage from `config` and build an engine on it.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = storage::connect(&config.storage).await?;
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(storage::begin_immediate(&self.pool).await?)
    }

    /// First-login registration. Returns the stored user.
    ///
    /// Calling again with the same name is a no-op that also backfills any
    /// mission rows the user is missing.
    pub async fn enroll(&self, employee_id: &str, name: &str) -> Result<User> {
        self.enroll_with_role(employee_id, name, Role::User).await
    }

    pub async fn enroll_with_role(&self, employee_id: &str, name: &str, role: Role) -> Result<User> {
        let mut tx = self.begin().await?;
        let result = self.enroll_in_tx(&mut tx, employee_id, name, role).await;
        storage::finish(tx, result).await
    }

    async fn enroll_in_tx(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        name: &str,
        role: Role,
    ) -> Result<User> {
        let employee_id = employee_id.trim();
        let name = name.trim();
        if employee_id.is_empty() || name.is_empty() {
            return Err(RewardError::Validation(
                "employee id and name are required".to_string(),
            ));
        }

        match users::find(conn, employee_id).await? {
            Some(existing) if existing.name != name => {
                return Err(RewardError::Validation(format!(
                    "name does not match employee {employee_id}"
                )));
            }
            Some(_) => {}
            None => {
                users::insert(conn, &User::new(employee_id, name, role)).await?;
                info!(employee_id, %role, "user enrolled");
            }
        }

        self.missions.enroll(conn, employee_id).await?;
        require_user(conn, employee_id).await
    }

    /// Check in at a booth. The first scan pays; repeats change nothing.
    pub async fn record_visit(&self, employee_id: &str, booth_id: &str) -> Result<VisitOutcome> {
        let mut tx = self.begin().await?;
        let result = self.record_visit_in_tx(&mut tx, employee_id, booth_id).await;
        storage::finish(tx, result).await
    }

    async fn record_visit_in_tx(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        booth_id: &str,
    ) -> Result<VisitOutcome> {
        require_user(conn, employee_id).await?;
        let booth = require_booth(conn, booth_id).await?;

        if booths::visit_exists(conn, employee_id, booth_id).await? {
            info!(employee_id, booth_id, "repeat visit ignored");
            return Ok(VisitOutcome {
                points_earned: 0,
                balance: ledger::balance(conn, employee_id).await?,
                duplicate: true,
                missions: TrackerReport::default(),
            });
        }

        let points = self.rewards.visit_points;
        booths::insert_visit(
            conn,
            &Visit {
                employee_id: employee_id.to_string(),
                booth_id: booth_id.to_string(),
                points_earned: points,
                visited_at: now(),
            },
        )
        .await?;
        if points > 0 {
            ledger::append(conn, employee_id, points, LedgerReason::Visit, booth_id).await?;
        }

        let visitor_count = booths::increment_visitor_count(conn, booth_id).await?;
        let missions = self
            .missions
            .on_event(conn, employee_id, &MissionEvent::visit())
            .await?;
        if let Some(owner) = booth.owner_employee_id.as_deref() {
            self.missions
                .on_event(conn, owner, &MissionEvent::booth_visitors(visitor_count))
                .await?;
        }

        let balance = ledger::balance(conn, employee_id).await?;
        info!(employee_id, booth_id, points, balance, visitor_count, "visit recorded");
        Ok(VisitOutcome {
            points_earned: points,
            balance,
            duplicate: false,
            missions,
        })
    }

    /// Score a visited booth against the rubric. One evaluation per booth.
    pub async fn record_evaluation(
        &self,
        employee_id: &str,
        booth_id: &str,
        scores: EvaluationScores,
    ) -> Result<EvaluationOutcome> {
        if let Some((criterion, score)) = scores.first_invalid() {
            return Err(RewardError::Validation(format!(
                "score for {criterion} must be between {} and {}, got {score}",
                crate::booths::SCORE_RANGE.start(),
                crate::booths::SCORE_RANGE.end()
            )));
        }

        let mut tx = self.begin().await?;
        let result = self
            .record_evaluation_in_tx(&mut tx, employee_id, booth_id, &scores)
            .await;
        storage::finish(tx, result).await
    }

    async fn record_evaluation_in_tx(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        booth_id: &str,
        scores: &EvaluationScores,
    ) -> Result<EvaluationOutcome> {
        require_user(conn, employee_id).await?;
        require_booth(conn, booth_id).await?;

        if !booths::visit_exists(conn, employee_id, booth_id).await? {
            return Err(RewardError::Validation(format!(
                "booth {booth_id} must be visited before it can be evaluated"
            )));
        }

        if booths::evaluation_exists(conn, employee_id, booth_id).await? {
            info!(employee_id, booth_id, "repeat evaluation ignored");
            return Ok(EvaluationOutcome {
                points_earned: 0,
                balance: ledger::balance(conn, employee_id).await?,
                duplicate: true,
                missions: TrackerReport::default(),
            });
        }

        booths::insert_evaluation(conn, employee_id, booth_id, scores).await?;
        let points = self.rewards.evaluation_points;
        if points > 0 {
            ledger::append(conn, employee_id, points, LedgerReason::Evaluation, booth_id).await?;
        }
        let missions = self
            .missions
            .on_event(conn, employee_id, &MissionEvent::evaluation())
            .await?;

        let balance = ledger::balance(conn, employee_id).await?;
        info!(
            employee_id,
            booth_id,
            total_score = scores.total(),
            points,
            balance,
            "evaluation recorded"
        );
        Ok(EvaluationOutcome {
            points_earned: points,
            balance,
            duplicate: false,
            missions,
        })
    }

    /// An improvement suggestion left on a booth.
    pub async fn record_comment(&self, employee_id: &str, booth_id: &str) -> Result<TrackerReport> {
        self.booth_event(employee_id, booth_id, MissionEvent::comment())
            .await
    }

    /// A sincere review of a booth.
    pub async fn record_review(&self, employee_id: &str, booth_id: &str) -> Result<TrackerReport> {
        self.booth_event(employee_id, booth_id, MissionEvent::review())
            .await
    }

    /// The growth zone QR scan.
    pub async fn complete_growth_zone(&self, employee_id: &str) -> Result<TrackerReport> {
        let mut tx = self.begin().await?;
        let result = self
            .event_in_tx(&mut tx, employee_id, None, MissionEvent::growth_zone())
            .await;
        storage::finish(tx, result).await
    }

    async fn booth_event(
        &self,
        employee_id: &str,
        booth_id: &str,
        event: MissionEvent,
    ) -> Result<TrackerReport> {
        let mut tx = self.begin().await?;
        let result = self
            .event_in_tx(&mut tx, employee_id, Some(booth_id), event)
            .await;
        storage::finish(tx, result).await
    }

    async fn event_in_tx(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        booth_id: Option<&str>,
        event: MissionEvent,
    ) -> Result<TrackerReport> {
        require_user(conn, employee_id).await?;
        if let Some(booth_id) = booth_id {
            require_booth(conn, booth_id).await?;
        }
        self.missions.on_event(conn, employee_id, &event).await
    }

    /// Complete an unlocked mission by hand.
    pub async fn complete_mission(&self, employee_id: &str, mission_id: &str) -> Result<UserMission> {
        let mut tx = self.begin().await?;
        let result = async {
            require_user(&mut tx, employee_id).await?;
            let (mission, _) = self
                .missions
                .complete(&mut tx, employee_id, mission_id)
                .await?;
            Ok::<_, RewardError>(mission)
        }
        .await;
        storage::finish(tx, result).await
    }

    /// Draw once from the gacha.
    ///
    /// Write conflicts are retried with backoff. A retry runs against fresh
    /// stock, so a lost race for the last unit surfaces as `OutOfStock`.
    pub async fn spend_on_gacha(&self, employee_id: &str) -> Result<GachaResult> {
        (|| async { self.spend_on_gacha_once(employee_id).await })
            .retry(gacha_backoff(&self.gacha_config))
            .when(RewardError::is_retryable)
            .notify(|err: &RewardError, dur: Duration| {
                warn!(employee_id, error = %err, delay = ?dur, "gacha draw conflicted, retrying");
            })
            .await
    }

    async fn spend_on_gacha_once(&self, employee_id: &str) -> Result<GachaResult> {
        let mut tx = self.begin().await?;
        let result = async {
            require_user(&mut tx, employee_id).await?;
            let mut result = self.gacha.attempt(&mut tx, employee_id).await?;
            self.missions
                .on_event(
                    &mut tx,
                    employee_id,
                    &MissionEvent::gacha_attempt(result.attempt_number),
                )
                .await?;
            result.remaining_points = ledger::balance(&mut tx, employee_id).await?;
            Ok::<_, RewardError>(result)
        }
        .await;
        storage::finish(tx, result).await
    }

    /// Charge a booth entry fee.
    ///
    /// `request_key` makes client retries safe; without one every call charges.
    pub async fn spend_on_booth_entry(
        &self,
        employee_id: &str,
        amount: i64,
        request_key: Option<&str>,
    ) -> Result<SpendOutcome> {
        if amount <= 0 {
            return Err(RewardError::Validation(format!(
                "booth entry fee must be positive, got {amount}"
            )));
        }
        let reference = match request_key {
            Some(key) => key.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let mut tx = self.begin().await?;
        let result = ledger::append(
            &mut tx,
            employee_id,
            -amount,
            LedgerReason::BoothEntrySpend,
            &reference,
        )
        .await;
        let outcome = storage::finish(tx, result).await?;

        info!(
            employee_id,
            amount,
            reference = %reference,
            balance = outcome.balance,
            applied = outcome.applied,
            "booth entry charged"
        );
        Ok(SpendOutcome {
            balance: outcome.balance,
            applied: outcome.applied,
        })
    }

    pub async fn profile(&self, employee_id: &str) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, employee_id).await
    }

    pub async fn balance(&self, employee_id: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, employee_id).await?;
        ledger::balance(&mut conn, employee_id).await
    }

    pub async fn missions(&self, employee_id: &str) -> Result<Vec<MissionView>> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, employee_id).await?;
        self.missions.list(&mut conn, employee_id).await
    }

    pub async fn gacha_history(&self, employee_id: &str) -> Result<Vec<GachaAttempt>> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, employee_id).await?;
        self.gacha.history(&mut conn, employee_id).await
    }

    /// Ledger entries, oldest first.
    pub async fn ledger(&self, employee_id: &str) -> Result<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, employee_id).await?;
        ledger::entries(&mut conn, employee_id).await
    }

    pub async fn audit(&self, employee_id: &str) -> Result<BalanceAudit> {
        let mut conn = self.pool.acquire().await?;
        ledger::audit(&mut conn, employee_id).await
    }

    /// Audit every user and return the ones whose cached balance drifted
    /// from their ledger.
    pub async fn audit_all(&self) -> Result<Vec<BalanceAudit>> {
        let mut conn = self.pool.acquire().await?;
        let mut drifted = Vec::new();
        for employee_id in users::list_ids(&mut conn).await? {
            let audit = ledger::audit(&mut conn, &employee_id).await?;
            if !audit.is_consistent() {
                warn!(
                    employee_id = %audit.employee_id,
                    cached = audit.cached,
                    ledger_sum = audit.ledger_sum,
                    "balance drifted from ledger"
                );
                drifted.push(audit);
            }
        }
        Ok(drifted)
    }

    pub async fn goods(&self) -> Result<Vec<GoodsStock>> {
        let mut conn = self.pool.acquire().await?;
        Ok(goods::list(&mut conn).await?)
    }

    /// Number of draws that awarded `goods_id`.
    pub async fn awarded(&self, goods_id: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Ok(goods::count_awarded(&mut conn, goods_id).await?)
    }

    pub async fn booth(&self, booth_id: &str) -> Result<Booth> {
        let mut conn = self.pool.acquire().await?;
        require_booth(&mut conn, booth_id).await
    }

    /// Add a booth unless it exists. Returns whether it was added.
    pub async fn register_booth(&self, booth: &Booth) -> Result<bool> {
        if booth.booth_id.trim().is_empty() {
            return Err(RewardError::Validation("booth id is required".to_string()));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(booths::insert(&mut conn, booth).await?)
    }

    /// Add a prize unless it exists. Returns whether it was added.
    pub async fn register_goods(&self, item: &GoodsStock) -> Result<bool> {
        if item.total_stock < 0 || !(0..=item.total_stock).contains(&item.remaining_stock) {
            return Err(RewardError::Validation(format!(
                "stock for {} must satisfy 0 <= remaining <= total",
                item.goods_id
            )));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(goods::insert(&mut conn, item).await?)
    }
}

async fn require_user(conn: &mut SqliteConnection, employee_id: &str) -> Result<User> {
    users::find(conn, employee_id)
        .await?
        .ok_or_else(|| RewardError::UnknownUser(employee_id.to_string()))
}

async fn require_booth(conn: &mut SqliteConnection, booth_id: &str) -> Result<Booth> {
    booths::find(conn, booth_id)
        .await?
        .ok_or_else(|| RewardError::UnknownBooth(booth_id.to_string()))
}
