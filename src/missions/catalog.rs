//! Mission definitions.
//!
//! A definition says when a mission unlocks, which events move it forward,
//! how far it has to go and what it pays on completion. Definitions are data;
//! the tracker interprets them.

/// Kinds of activity the tracker reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Visit,
    Evaluation,
    Comment,
    GrowthZone,
    Review,
    GachaAttempt,
    /// A check-in at a booth owned by the user; value is the booth's visitor count.
    BoothVisitors,
}

/// One observed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionEvent {
    pub kind: EventKind,
    /// Running figure carried by the event (visitor count, attempt number). 1 otherwise.
    pub value: i64,
}

impl MissionEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, value: 1 }
    }

    pub fn with_value(kind: EventKind, value: i64) -> Self {
        Self { kind, value }
    }

    pub fn visit() -> Self {
        Self::new(EventKind::Visit)
    }

    pub fn evaluation() -> Self {
        Self::new(EventKind::Evaluation)
    }

    pub fn comment() -> Self {
        Self::new(EventKind::Comment)
    }

    pub fn growth_zone() -> Self {
        Self::new(EventKind::GrowthZone)
    }

    pub fn review() -> Self {
        Self::new(EventKind::Review)
    }

    pub fn gacha_attempt(attempt_number: i64) -> Self {
        Self::with_value(EventKind::GachaAttempt, attempt_number)
    }

    pub fn booth_visitors(visitor_count: i64) -> Self {
        Self::with_value(EventKind::BoothVisitors, visitor_count)
    }
}

/// When a locked mission opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockRule {
    /// Unlocked from enrollment.
    Open,
    /// On an event of `kind` whose value is at least `at_least`.
    OnEvent { kind: EventKind, at_least: i64 },
    /// Once every listed mission is completed.
    AfterMissions(Vec<String>),
}

impl UnlockRule {
    /// Whether the rule holds given the current event (if any) and the set
    /// of missions the user has completed.
    pub fn holds(&self, event: Option<&MissionEvent>, completed: impl Fn(&str) -> bool) -> bool {
        match self {
            UnlockRule::Open => true,
            UnlockRule::OnEvent { kind, at_least } => {
                event.is_some_and(|e| e.kind == *kind && e.value >= *at_least)
            }
            UnlockRule::AfterMissions(ids) => ids.iter().all(|id| completed(id)),
        }
    }
}

/// How an event moves an unlocked mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressRule {
    /// Each event of `kind` adds one.
    Count(EventKind),
    /// The first event of `kind` with value at least `at_least` jumps to target.
    Reach { kind: EventKind, at_least: i64 },
}

/// Effect of an event on a mission's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advance(i64),
    ReachTarget,
}

impl ProgressRule {
    pub fn step(&self, event: &MissionEvent) -> Option<Step> {
        match self {
            ProgressRule::Count(kind) if event.kind == *kind => Some(Step::Advance(1)),
            ProgressRule::Reach { kind, at_least }
                if event.kind == *kind && event.value >= *at_least =>
            {
                Some(Step::ReachTarget)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionDefinition {
    pub mission_id: String,
    pub title: String,
    pub description: String,
    pub target: i64,
    /// Points credited once on completion; zero for none.
    pub bonus_points: i64,
    pub unlock: UnlockRule,
    pub progress: ProgressRule,
}

impl MissionDefinition {
    pub fn new(
        mission_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        target: i64,
        unlock: UnlockRule,
        progress: ProgressRule,
    ) -> Self {
        Self {
            mission_id: mission_id.into(),
            title: title.into(),
            description: description.into(),
            target,
            bonus_points: 0,
            unlock,
            progress,
        }
    }

    pub fn with_bonus(mut self, bonus_points: i64) -> Self {
        self.bonus_points = bonus_points;
        self
    }
}

/// The ordered set of missions every enrolled user tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionCatalog {
    definitions: Vec<MissionDefinition>,
}

impl MissionCatalog {
    pub fn new(definitions: Vec<MissionDefinition>) -> Self {
        Self { definitions }
    }

    pub fn get(&self, mission_id: &str) -> Option<&MissionDefinition> {
        self.definitions.iter().find(|d| d.mission_id == mission_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissionDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Visitors the booth owner needs before the results mission appears.
pub const OWNER_UNLOCK_VISITORS: i64 = 30;
/// Visitors that complete the results mission.
pub const OWNER_TARGET_VISITORS: i64 = 70;

impl Default for MissionCatalog {
    /// The fair's five missions.
    fn default() -> Self {
        Self::new(vec![
            MissionDefinition::new(
                "M1",
                "Be new tomorrow",
                "Leave an improvement suggestion on another booth's idea.",
                1,
                UnlockRule::Open,
                ProgressRule::Count(EventKind::Comment),
            )
            .with_bonus(10),
            MissionDefinition::new(
                "M2",
                "Dream big",
                "Try the growth zone and scan its QR code.",
                1,
                UnlockRule::Open,
                ProgressRule::Count(EventKind::GrowthZone),
            )
            .with_bonus(10),
            MissionDefinition::new(
                "M3",
                "Prove it with results",
                "Get 70 or more visitors to your own booth.",
                1,
                UnlockRule::OnEvent {
                    kind: EventKind::BoothVisitors,
                    at_least: OWNER_UNLOCK_VISITORS,
                },
                ProgressRule::Reach {
                    kind: EventKind::BoothVisitors,
                    at_least: OWNER_TARGET_VISITORS,
                },
            )
            .with_bonus(10),
            MissionDefinition::new(
                "M4",
                "Try again",
                "Take on the gacha twice.",
                2,
                UnlockRule::OnEvent {
                    kind: EventKind::GachaAttempt,
                    at_least: 1,
                },
                ProgressRule::Count(EventKind::GachaAttempt),
            ),
            MissionDefinition::new(
                "M5",
                "Sincerely",
                "Write 12 sincere reviews.",
                12,
                UnlockRule::OnEvent {
                    kind: EventKind::Review,
                    at_least: 1,
                },
                ProgressRule::Count(EventKind::Review),
            )
            .with_bonus(10),
        ])
    }
}
