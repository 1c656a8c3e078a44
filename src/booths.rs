//! Booths, check-ins and rubric evaluations.
//!
//! Booth content is managed elsewhere; the reward engine only needs identity,
//! ownership (for the booth owner's visitor mission) and the visitor count.

/// An exhibition booth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booth {
    pub booth_id: String,
    pub name: String,
    pub zone: String,
    pub floor: String,
    /// Employee whose visitor mission counts this booth's check-ins.
    pub owner_employee_id: Option<String>,
    pub visitor_count: i64,
}

impl Booth {
    pub fn new(
        booth_id: impl Into<String>,
        name: impl Into<String>,
        zone: impl Into<String>,
        floor: impl Into<String>,
    ) -> Self {
        Self {
            booth_id: booth_id.into(),
            name: name.into(),
            zone: zone.into(),
            floor: floor.into(),
            owner_employee_id: None,
            visitor_count: 0,
        }
    }

    pub fn with_owner(mut self, owner_employee_id: Option<String>) -> Self {
        self.owner_employee_id = owner_employee_id;
        self
    }
}

/// A user's first check-in at a booth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub employee_id: String,
    pub booth_id: String,
    pub points_earned: i64,
    pub visited_at: String,
}

/// Number of rubric criteria.
pub const RUBRIC_LEN: usize = 6;

/// Rubric criteria, in column order.
pub const RUBRIC: [&str; RUBRIC_LEN] = [
    "first",
    "best",
    "different",
    "number_one",
    "gap",
    "global",
];

/// Lowest and highest score a criterion accepts.
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

/// Scores for every rubric criterion, in [`RUBRIC`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationScores(pub [i64; RUBRIC_LEN]);

impl EvaluationScores {
    /// Name of the first criterion whose score falls outside [`SCORE_RANGE`].
    pub fn first_invalid(&self) -> Option<(&'static str, i64)> {
        RUBRIC
            .iter()
            .zip(self.0.iter())
            .find(|(_, score)| !SCORE_RANGE.contains(*score))
            .map(|(name, score)| (*name, *score))
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }
}
