//! SQLite access to the `ledger_entries` table.
//!
//! Rows are inserted and read, never updated or deleted.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::ledger::{LedgerEntry, LedgerReason};
use crate::storage::schema::LedgerEntries;
use crate::storage::{Result, StorageError};

fn from_row(row: &SqliteRow) -> Result<LedgerEntry> {
    let reason: String = row.get("reason");
    let reason = reason
        .parse::<LedgerReason>()
        .map_err(|detail| StorageError::Corrupt {
            table: "ledger_entries",
            detail,
        })?;
    Ok(LedgerEntry {
        entry_id: row.get("entry_id"),
        employee_id: row.get("employee_id"),
        delta: row.get("delta"),
        reason,
        reference_id: row.get("reference_id"),
        created_at: row.get("created_at"),
    })
}

fn select_entries() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            LedgerEntries::EntryId,
            LedgerEntries::EmployeeId,
            LedgerEntries::Delta,
            LedgerEntries::Reason,
            LedgerEntries::ReferenceId,
            LedgerEntries::CreatedAt,
        ])
        .from(LedgerEntries::Table)
        .to_owned()
}

pub async fn find_entry(
    conn: &mut SqliteConnection,
    employee_id: &str,
    reason: LedgerReason,
    reference_id: &str,
) -> Result<Option<LedgerEntry>> {
    let query = select_entries()
        .and_where(Expr::col(LedgerEntries::EmployeeId).eq(employee_id))
        .and_where(Expr::col(LedgerEntries::Reason).eq(reason.as_str()))
        .and_where(Expr::col(LedgerEntries::ReferenceId).eq(reference_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn insert_entry(
    conn: &mut SqliteConnection,
    employee_id: &str,
    delta: i64,
    reason: LedgerReason,
    reference_id: &str,
) -> Result<()> {
    let query = Query::insert()
        .into_table(LedgerEntries::Table)
        .columns([
            LedgerEntries::EmployeeId,
            LedgerEntries::Delta,
            LedgerEntries::Reason,
            LedgerEntries::ReferenceId,
            LedgerEntries::CreatedAt,
        ])
        .values_panic([
            employee_id.into(),
            delta.into(),
            reason.as_str().into(),
            reference_id.into(),
            crate::storage::now().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// Sum of all deltas for a user; zero when there are none.
pub async fn sum_deltas(conn: &mut SqliteConnection, employee_id: &str) -> Result<i64> {
    let query = Query::select()
        .expr(Expr::col(LedgerEntries::Delta).sum())
        .from(LedgerEntries::Table)
        .and_where(Expr::col(LedgerEntries::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    let sum: Option<i64> = row.get(0);
    Ok(sum.unwrap_or(0))
}

pub async fn list_entries(
    conn: &mut SqliteConnection,
    employee_id: &str,
) -> Result<Vec<LedgerEntry>> {
    let query = select_entries()
        .and_where(Expr::col(LedgerEntries::EmployeeId).eq(employee_id))
        .order_by(LedgerEntries::EntryId, Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    rows.iter().map(from_row).collect()
}
