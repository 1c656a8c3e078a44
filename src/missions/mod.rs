//! Mission tracker.
//!
//! Every enrolled user holds one row per catalog mission. The tracker feeds
//! each reward event through the catalog: it first unlocks missions whose
//! unlock rule the event satisfies, then advances unlocked missions whose
//! progress rule matches. An event that unlocks a mission also counts toward
//! it.
//!
//! Completion stamps the row, bumps the user's completed count and, when the
//! mission pays a bonus, appends a `MISSION` ledger entry keyed by the
//! mission ID so a mission can never pay twice. Like the rest of the engine,
//! the tracker runs inside the caller's write transaction.

pub mod catalog;
mod state;

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{Result, RewardError};
use crate::ledger::{self, LedgerReason};
use crate::storage::sqlite::{missions as store, users};
use crate::storage::now;

pub use catalog::{
    EventKind, MissionCatalog, MissionDefinition, MissionEvent, ProgressRule, UnlockRule,
};
pub use state::{MissionState, UserMission};

/// Description shown in place of a locked mission's text.
pub const HIDDEN_DESCRIPTION: &str = "???";

/// What one tracker pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerReport {
    pub unlocked: Vec<String>,
    pub completed: Vec<String>,
    /// Bonus points credited by the completions above.
    pub bonus_points: i64,
}

impl TrackerReport {
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty() && self.completed.is_empty()
    }
}

/// A mission as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionView {
    pub mission_id: String,
    pub title: String,
    pub description: String,
    pub progress: i64,
    pub target: i64,
    pub state: MissionState,
    pub bonus_points: i64,
    pub completed_at: Option<String>,
}

pub struct MissionTracker {
    catalog: Arc<MissionCatalog>,
}

impl MissionTracker {
    pub fn new(catalog: Arc<MissionCatalog>) -> Self {
        Self { catalog }
    }

    /// Create any catalog mission rows the user is missing.
    ///
    /// Returns how many rows were created.
    pub async fn enroll(&self, conn: &mut SqliteConnection, employee_id: &str) -> Result<usize> {
        let now = now();
        let mut created = 0;
        for definition in self.catalog.iter() {
            let row = UserMission::enroll(employee_id, definition, &now);
            if store::insert_if_missing(conn, &row).await? {
                created += 1;
            }
        }
        if created > 0 {
            debug!(employee_id, created, "mission rows created");
        }
        Ok(created)
    }

    /// Apply one event to every mission the user holds.
    pub async fn on_event(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        event: &MissionEvent,
    ) -> Result<TrackerReport> {
        let mut rows = store::list(conn, employee_id).await?;
        let mut report = TrackerReport::default();
        if rows.is_empty() {
            return Ok(report);
        }

        let now = now();
        let mut completed: HashSet<String> = rows
            .iter()
            .filter(|r| r.is_completed)
            .map(|r| r.mission_id.clone())
            .collect();

        for definition in self.catalog.iter() {
            let Some(row) = rows.iter_mut().find(|r| r.mission_id == definition.mission_id) else {
                continue;
            };
            if row.is_completed {
                continue;
            }

            let mut changed = false;
            if !row.is_unlocked
                && definition
                    .unlock
                    .holds(Some(event), |id| completed.contains(id))
            {
                changed |= row.unlock(&now);
                report.unlocked.push(row.mission_id.clone());
            }

            let mut finished = false;
            if row.is_unlocked {
                if let Some(step) = definition.progress.step(event) {
                    let before = row.progress;
                    finished = row.advance(step, &now);
                    changed |= finished || row.progress != before;
                }
            }

            if changed {
                persist(conn, row).await?;
            }
            if finished {
                report.bonus_points += self.pay_completion(conn, employee_id, definition).await?;
                completed.insert(row.mission_id.clone());
                report.completed.push(row.mission_id.clone());
            }
        }

        if !report.completed.is_empty() {
            self.unlock_dependents(conn, &mut rows, &completed, &now, &mut report)
                .await?;
        }

        if !report.is_empty() {
            info!(
                employee_id,
                event = ?event.kind,
                unlocked = ?report.unlocked,
                completed = ?report.completed,
                bonus_points = report.bonus_points,
                "missions updated"
            );
        }
        Ok(report)
    }

    /// Complete an unlocked mission directly.
    pub async fn complete(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        mission_id: &str,
    ) -> Result<(UserMission, TrackerReport)> {
        let definition = self
            .catalog
            .get(mission_id)
            .ok_or_else(|| RewardError::UnknownMission(mission_id.to_string()))?;

        let mut rows = store::list(conn, employee_id).await?;
        let row = rows
            .iter_mut()
            .find(|r| r.mission_id == mission_id)
            .ok_or_else(|| RewardError::UnknownMission(mission_id.to_string()))?;

        match row.state() {
            MissionState::Completed => {
                return Err(RewardError::AlreadyCompleted(mission_id.to_string()))
            }
            MissionState::Locked => return Err(RewardError::NotUnlocked(mission_id.to_string())),
            MissionState::Unlocked => {}
        }

        let now = now();
        row.mark_completed(&now);
        persist(conn, row).await?;
        let updated = row.clone();

        let mut report = TrackerReport {
            completed: vec![mission_id.to_string()],
            bonus_points: self.pay_completion(conn, employee_id, definition).await?,
            ..TrackerReport::default()
        };
        let completed: HashSet<String> = rows
            .iter()
            .filter(|r| r.is_completed)
            .map(|r| r.mission_id.clone())
            .collect();
        self.unlock_dependents(conn, &mut rows, &completed, &now, &mut report)
            .await?;

        info!(
            employee_id,
            mission_id,
            bonus_points = report.bonus_points,
            "mission completed"
        );
        Ok((updated, report))
    }

    /// The user's missions in catalog order.
    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
    ) -> Result<Vec<MissionView>> {
        let rows = store::list(conn, employee_id).await?;
        Ok(self
            .catalog
            .iter()
            .filter_map(|definition| {
                let row = rows.iter().find(|r| r.mission_id == definition.mission_id)?;
                let state = row.state();
                Some(MissionView {
                    mission_id: definition.mission_id.clone(),
                    title: definition.title.clone(),
                    description: if state == MissionState::Locked {
                        HIDDEN_DESCRIPTION.to_string()
                    } else {
                        definition.description.clone()
                    },
                    progress: row.progress,
                    target: row.target,
                    state,
                    bonus_points: definition.bonus_points,
                    completed_at: row.completed_at.clone(),
                })
            })
            .collect())
    }

    /// Bump the completed count and pay the bonus. Returns points credited.
    async fn pay_completion(
        &self,
        conn: &mut SqliteConnection,
        employee_id: &str,
        definition: &MissionDefinition,
    ) -> Result<i64> {
        users::increment_missions_completed(conn, employee_id).await?;
        if definition.bonus_points <= 0 {
            return Ok(0);
        }
        let outcome = ledger::append(
            conn,
            employee_id,
            definition.bonus_points,
            LedgerReason::Mission,
            &definition.mission_id,
        )
        .await?;
        Ok(if outcome.applied {
            definition.bonus_points
        } else {
            0
        })
    }

    /// Unlock locked missions whose prerequisites are now all complete.
    async fn unlock_dependents(
        &self,
        conn: &mut SqliteConnection,
        rows: &mut [UserMission],
        completed: &HashSet<String>,
        now: &str,
        report: &mut TrackerReport,
    ) -> Result<()> {
        for definition in self.catalog.iter() {
            if !matches!(definition.unlock, UnlockRule::AfterMissions(_)) {
                continue;
            }
            let Some(row) = rows.iter_mut().find(|r| r.mission_id == definition.mission_id) else {
                continue;
            };
            if row.is_unlocked || !definition.unlock.holds(None, |id| completed.contains(id)) {
                continue;
            }
            row.unlock(now);
            persist(conn, row).await?;
            report.unlocked.push(row.mission_id.clone());
        }
        Ok(())
    }
}

async fn persist(conn: &mut SqliteConnection, row: &UserMission) -> Result<()> {
    if !store::update(conn, row).await? {
        return Err(RewardError::ConcurrencyConflict(format!(
            "mission {} for {} changed underneath the tracker",
            row.mission_id, row.employee_id
        )));
    }
    Ok(())
}
