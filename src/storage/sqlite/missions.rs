//! SQLite access to `user_missions`.

use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::missions::UserMission;
use crate::storage::schema::UserMissions;
use crate::storage::Result;

fn from_row(row: &SqliteRow) -> UserMission {
    UserMission {
        employee_id: row.get("employee_id"),
        mission_id: row.get("mission_id"),
        progress: row.get("progress"),
        target: row.get("target"),
        is_unlocked: row.get("is_unlocked"),
        is_completed: row.get("is_completed"),
        unlocked_at: row.get("unlocked_at"),
        completed_at: row.get("completed_at"),
    }
}

/// Insert a mission row unless the user already has one. Returns whether it was inserted.
pub async fn insert_if_missing(conn: &mut SqliteConnection, mission: &UserMission) -> Result<bool> {
    let query = Query::insert()
        .into_table(UserMissions::Table)
        .columns([
            UserMissions::EmployeeId,
            UserMissions::MissionId,
            UserMissions::Progress,
            UserMissions::Target,
            UserMissions::IsUnlocked,
            UserMissions::IsCompleted,
            UserMissions::UnlockedAt,
            UserMissions::CompletedAt,
        ])
        .values_panic([
            mission.employee_id.as_str().into(),
            mission.mission_id.as_str().into(),
            mission.progress.into(),
            mission.target.into(),
            mission.is_unlocked.into(),
            mission.is_completed.into(),
            mission.unlocked_at.clone().into(),
            mission.completed_at.clone().into(),
        ])
        .on_conflict(
            OnConflict::columns([UserMissions::EmployeeId, UserMissions::MissionId])
                .do_nothing()
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

/// All of a user's mission rows, ordered by mission ID.
pub async fn list(conn: &mut SqliteConnection, employee_id: &str) -> Result<Vec<UserMission>> {
    let query = Query::select()
        .columns([
            UserMissions::EmployeeId,
            UserMissions::MissionId,
            UserMissions::Progress,
            UserMissions::Target,
            UserMissions::IsUnlocked,
            UserMissions::IsCompleted,
            UserMissions::UnlockedAt,
            UserMissions::CompletedAt,
        ])
        .from(UserMissions::Table)
        .and_where(Expr::col(UserMissions::EmployeeId).eq(employee_id))
        .order_by(UserMissions::MissionId, Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(from_row).collect())
}

/// Write back progress and flags.
///
/// The `is_completed = 0` guard keeps a completed row frozen.
pub async fn update(conn: &mut SqliteConnection, mission: &UserMission) -> Result<bool> {
    let query = Query::update()
        .table(UserMissions::Table)
        .values([
            (UserMissions::Progress, mission.progress.into()),
            (UserMissions::IsUnlocked, mission.is_unlocked.into()),
            (UserMissions::IsCompleted, mission.is_completed.into()),
            (UserMissions::UnlockedAt, mission.unlocked_at.clone().into()),
            (UserMissions::CompletedAt, mission.completed_at.clone().into()),
        ])
        .and_where(Expr::col(UserMissions::EmployeeId).eq(mission.employee_id.as_str()))
        .and_where(Expr::col(UserMissions::MissionId).eq(mission.mission_id.as_str()))
        .and_where(Expr::col(UserMissions::IsCompleted).eq(false))
        .and_where(Expr::col(UserMissions::Progress).lte(mission.progress))
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}
