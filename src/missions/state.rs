//! Per-user mission state.
//!
//! A mission only moves forward: `Locked -> Unlocked -> Completed`. Progress
//! never decreases and is clamped to the target.

use std::fmt;

use super::catalog::{MissionDefinition, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissionState {
    Locked,
    Unlocked,
    Completed,
}

impl MissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionState::Locked => "LOCKED",
            MissionState::Unlocked => "UNLOCKED",
            MissionState::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's row for one mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMission {
    pub employee_id: String,
    pub mission_id: String,
    pub progress: i64,
    pub target: i64,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub unlocked_at: Option<String>,
    pub completed_at: Option<String>,
}

impl UserMission {
    /// Fresh row for `definition`, already unlocked when its rule is open.
    pub fn enroll(employee_id: &str, definition: &MissionDefinition, now: &str) -> Self {
        let open = matches!(definition.unlock, super::catalog::UnlockRule::Open);
        Self {
            employee_id: employee_id.to_string(),
            mission_id: definition.mission_id.clone(),
            progress: 0,
            target: definition.target,
            is_unlocked: open,
            is_completed: false,
            unlocked_at: open.then(|| now.to_string()),
            completed_at: None,
        }
    }

    pub fn state(&self) -> MissionState {
        if self.is_completed {
            MissionState::Completed
        } else if self.is_unlocked {
            MissionState::Unlocked
        } else {
            MissionState::Locked
        }
    }

    /// Open a locked mission. Returns whether anything changed.
    pub fn unlock(&mut self, now: &str) -> bool {
        if self.is_unlocked {
            return false;
        }
        self.is_unlocked = true;
        self.unlocked_at = Some(now.to_string());
        true
    }

    /// Apply a progress step to an unlocked, incomplete mission.
    ///
    /// Returns true when the step completed the mission.
    pub fn advance(&mut self, step: Step, now: &str) -> bool {
        if self.state() != MissionState::Unlocked {
            return false;
        }
        self.progress = match step {
            Step::Advance(n) => (self.progress + n).min(self.target),
            Step::ReachTarget => self.target,
        };
        if self.progress == self.target {
            self.mark_completed(now);
            return true;
        }
        false
    }

    /// Jump straight to completion.
    pub fn mark_completed(&mut self, now: &str) {
        self.progress = self.target;
        self.is_completed = true;
        self.completed_at = Some(now.to_string());
    }
}
