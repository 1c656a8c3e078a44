//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Attendees, keyed by employee ID.
#[derive(Iden)]
pub enum Users {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "name"]
    Name,
    #[iden = "total_points"]
    TotalPoints,
    #[iden = "missions_completed"]
    MissionsCompleted,
    #[iden = "role"]
    Role,
    #[iden = "created_at"]
    CreatedAt,
}

/// Append-only point ledger.
#[derive(Iden)]
pub enum LedgerEntries {
    Table,
    #[iden = "entry_id"]
    EntryId,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "delta"]
    Delta,
    #[iden = "reason"]
    Reason,
    #[iden = "reference_id"]
    ReferenceId,
    #[iden = "created_at"]
    CreatedAt,
}

/// Gacha prizes and their stock.
#[derive(Iden)]
pub enum Goods {
    Table,
    #[iden = "goods_id"]
    GoodsId,
    #[iden = "name"]
    Name,
    #[iden = "total_stock"]
    TotalStock,
    #[iden = "remaining_stock"]
    RemainingStock,
}

/// Successful gacha draws.
#[derive(Iden)]
pub enum GachaAttempts {
    Table,
    #[iden = "attempt_id"]
    AttemptId,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "attempt_number"]
    AttemptNumber,
    #[iden = "goods_id"]
    GoodsId,
    #[iden = "points_spent"]
    PointsSpent,
    #[iden = "created_at"]
    CreatedAt,
}

/// Per-user mission progress.
#[derive(Iden)]
pub enum UserMissions {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "mission_id"]
    MissionId,
    #[iden = "progress"]
    Progress,
    #[iden = "target"]
    Target,
    #[iden = "is_unlocked"]
    IsUnlocked,
    #[iden = "is_completed"]
    IsCompleted,
    #[iden = "unlocked_at"]
    UnlockedAt,
    #[iden = "completed_at"]
    CompletedAt,
}

/// Exhibition booths.
#[derive(Iden)]
pub enum Booths {
    Table,
    #[iden = "booth_id"]
    BoothId,
    #[iden = "name"]
    Name,
    #[iden = "zone"]
    Zone,
    #[iden = "floor"]
    Floor,
    #[iden = "owner_employee_id"]
    OwnerEmployeeId,
    #[iden = "visitor_count"]
    VisitorCount,
}

/// Booth check-ins.
#[derive(Iden)]
pub enum Visits {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "booth_id"]
    BoothId,
    #[iden = "points_earned"]
    PointsEarned,
    #[iden = "visited_at"]
    VisitedAt,
}

/// Rubric evaluations of booths.
#[derive(Iden)]
pub enum Evaluations {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "booth_id"]
    BoothId,
    #[iden = "score_first"]
    ScoreFirst,
    #[iden = "score_best"]
    ScoreBest,
    #[iden = "score_different"]
    ScoreDifferent,
    #[iden = "score_number_one"]
    ScoreNumberOne,
    #[iden = "score_gap"]
    ScoreGap,
    #[iden = "score_global"]
    ScoreGlobal,
    #[iden = "total_score"]
    TotalScore,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating every table, executed in order.
pub const CREATE_STATEMENTS: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS users (
    employee_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    total_points INTEGER NOT NULL DEFAULT 0,
    missions_completed INTEGER NOT NULL DEFAULT 0,
    role TEXT NOT NULL DEFAULT 'USER',
    created_at TEXT NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS ledger_entries (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL REFERENCES users(employee_id),
    delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (employee_id, reason, reference_id)
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_ledger_entries_employee ON ledger_entries(employee_id)",
    r#"
CREATE TABLE IF NOT EXISTS goods (
    goods_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    total_stock INTEGER NOT NULL,
    remaining_stock INTEGER NOT NULL,
    CHECK (remaining_stock >= 0 AND remaining_stock <= total_stock)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS gacha_attempts (
    attempt_id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL REFERENCES users(employee_id),
    attempt_number INTEGER NOT NULL,
    goods_id TEXT NOT NULL REFERENCES goods(goods_id),
    points_spent INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (employee_id, attempt_number)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS user_missions (
    employee_id TEXT NOT NULL REFERENCES users(employee_id),
    mission_id TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    target INTEGER NOT NULL,
    is_unlocked INTEGER NOT NULL DEFAULT 0,
    is_completed INTEGER NOT NULL DEFAULT 0,
    unlocked_at TEXT,
    completed_at TEXT,
    PRIMARY KEY (employee_id, mission_id),
    CHECK (progress >= 0 AND progress <= target)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS booths (
    booth_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    zone TEXT NOT NULL,
    floor TEXT NOT NULL,
    owner_employee_id TEXT,
    visitor_count INTEGER NOT NULL DEFAULT 0
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS visits (
    employee_id TEXT NOT NULL REFERENCES users(employee_id),
    booth_id TEXT NOT NULL REFERENCES booths(booth_id),
    points_earned INTEGER NOT NULL,
    visited_at TEXT NOT NULL,
    PRIMARY KEY (employee_id, booth_id)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS evaluations (
    employee_id TEXT NOT NULL REFERENCES users(employee_id),
    booth_id TEXT NOT NULL REFERENCES booths(booth_id),
    score_first INTEGER NOT NULL,
    score_best INTEGER NOT NULL,
    score_different INTEGER NOT NULL,
    score_number_one INTEGER NOT NULL,
    score_gap INTEGER NOT NULL,
    score_global INTEGER NOT NULL,
    total_score INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (employee_id, booth_id)
)
"#,
];
