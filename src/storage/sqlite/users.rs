//! SQLite access to the `users` table.

use sea_query::{Expr, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::storage::schema::Users;
use crate::storage::{Result, StorageError};
use crate::users::{Role, User};

fn from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let role = role.parse::<Role>().map_err(|detail| StorageError::Corrupt {
        table: "users",
        detail,
    })?;
    Ok(User {
        employee_id: row.get("employee_id"),
        name: row.get("name"),
        total_points: row.get("total_points"),
        missions_completed: row.get("missions_completed"),
        role,
        created_at: row.get("created_at"),
    })
}

pub async fn find(conn: &mut SqliteConnection, employee_id: &str) -> Result<Option<User>> {
    let query = Query::select()
        .columns([
            Users::EmployeeId,
            Users::Name,
            Users::TotalPoints,
            Users::MissionsCompleted,
            Users::Role,
            Users::CreatedAt,
        ])
        .from(Users::Table)
        .and_where(Expr::col(Users::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn insert(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    let query = Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::EmployeeId,
            Users::Name,
            Users::TotalPoints,
            Users::MissionsCompleted,
            Users::Role,
            Users::CreatedAt,
        ])
        .values_panic([
            user.employee_id.as_str().into(),
            user.name.as_str().into(),
            user.total_points.into(),
            user.missions_completed.into(),
            user.role.as_str().into(),
            user.created_at.as_str().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// Overwrite the cached balance. Only the ledger append path calls this.
pub async fn set_total_points(
    conn: &mut SqliteConnection,
    employee_id: &str,
    total_points: i64,
) -> Result<()> {
    let query = Query::update()
        .table(Users::Table)
        .value(Users::TotalPoints, total_points)
        .and_where(Expr::col(Users::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

pub async fn increment_missions_completed(
    conn: &mut SqliteConnection,
    employee_id: &str,
) -> Result<()> {
    let query = Query::update()
        .table(Users::Table)
        .value(
            Users::MissionsCompleted,
            Expr::col(Users::MissionsCompleted).add(1),
        )
        .and_where(Expr::col(Users::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// Every employee ID, in order.
pub async fn list_ids(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let query = Query::select()
        .column(Users::EmployeeId)
        .from(Users::Table)
        .order_by(Users::EmployeeId, sea_query::Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(|row| row.get("employee_id")).collect())
}
