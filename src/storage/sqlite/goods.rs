//! SQLite access to `goods` and `gacha_attempts`.

use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::gacha::{GachaAttempt, GoodsStock};
use crate::storage::schema::{GachaAttempts, Goods};
use crate::storage::Result;

fn goods_from_row(row: &SqliteRow) -> GoodsStock {
    GoodsStock {
        goods_id: row.get("goods_id"),
        name: row.get("name"),
        total_stock: row.get("total_stock"),
        remaining_stock: row.get("remaining_stock"),
    }
}

fn select_goods() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            Goods::GoodsId,
            Goods::Name,
            Goods::TotalStock,
            Goods::RemainingStock,
        ])
        .from(Goods::Table)
        .to_owned()
}

/// Insert a prize unless one with the same ID exists. Returns whether it was inserted.
pub async fn insert(conn: &mut SqliteConnection, goods: &GoodsStock) -> Result<bool> {
    let query = Query::insert()
        .into_table(Goods::Table)
        .columns([
            Goods::GoodsId,
            Goods::Name,
            Goods::TotalStock,
            Goods::RemainingStock,
        ])
        .values_panic([
            goods.goods_id.as_str().into(),
            goods.name.as_str().into(),
            goods.total_stock.into(),
            goods.remaining_stock.into(),
        ])
        .on_conflict(OnConflict::column(Goods::GoodsId).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

/// All prizes ordered by ID.
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<GoodsStock>> {
    let query = select_goods()
        .order_by(Goods::GoodsId, Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(goods_from_row).collect())
}

/// Prizes with stock left, ordered by ID.
pub async fn list_available(conn: &mut SqliteConnection) -> Result<Vec<GoodsStock>> {
    let query = select_goods()
        .and_where(Expr::col(Goods::RemainingStock).gt(0))
        .order_by(Goods::GoodsId, Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(goods_from_row).collect())
}

/// Take one unit of stock. Returns false when the row had none left.
pub async fn decrement_stock(conn: &mut SqliteConnection, goods_id: &str) -> Result<bool> {
    let query = Query::update()
        .table(Goods::Table)
        .value(
            Goods::RemainingStock,
            Expr::col(Goods::RemainingStock).sub(1),
        )
        .and_where(Expr::col(Goods::GoodsId).eq(goods_id))
        .and_where(Expr::col(Goods::RemainingStock).gt(0))
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_attempts(conn: &mut SqliteConnection, employee_id: &str) -> Result<i64> {
    let query = Query::select()
        .expr(Expr::col(GachaAttempts::AttemptId).count())
        .from(GachaAttempts::Table)
        .and_where(Expr::col(GachaAttempts::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    Ok(row.get(0))
}

/// Number of draws that awarded `goods_id`.
pub async fn count_awarded(conn: &mut SqliteConnection, goods_id: &str) -> Result<i64> {
    let query = Query::select()
        .expr(Expr::col(GachaAttempts::AttemptId).count())
        .from(GachaAttempts::Table)
        .and_where(Expr::col(GachaAttempts::GoodsId).eq(goods_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    Ok(row.get(0))
}

pub async fn insert_attempt(
    conn: &mut SqliteConnection,
    employee_id: &str,
    attempt_number: i64,
    goods_id: &str,
    points_spent: i64,
) -> Result<()> {
    let query = Query::insert()
        .into_table(GachaAttempts::Table)
        .columns([
            GachaAttempts::EmployeeId,
            GachaAttempts::AttemptNumber,
            GachaAttempts::GoodsId,
            GachaAttempts::PointsSpent,
            GachaAttempts::CreatedAt,
        ])
        .values_panic([
            employee_id.into(),
            attempt_number.into(),
            goods_id.into(),
            points_spent.into(),
            crate::storage::now().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// A user's draws, newest first.
pub async fn list_attempts(
    conn: &mut SqliteConnection,
    employee_id: &str,
) -> Result<Vec<GachaAttempt>> {
    let query = Query::select()
        .column((GachaAttempts::Table, GachaAttempts::AttemptId))
        .column((GachaAttempts::Table, GachaAttempts::EmployeeId))
        .column((GachaAttempts::Table, GachaAttempts::AttemptNumber))
        .column((GachaAttempts::Table, GachaAttempts::GoodsId))
        .column((Goods::Table, Goods::Name))
        .column((GachaAttempts::Table, GachaAttempts::PointsSpent))
        .column((GachaAttempts::Table, GachaAttempts::CreatedAt))
        .from(GachaAttempts::Table)
        .inner_join(
            Goods::Table,
            Expr::col((GachaAttempts::Table, GachaAttempts::GoodsId))
                .equals((Goods::Table, Goods::GoodsId)),
        )
        .and_where(Expr::col((GachaAttempts::Table, GachaAttempts::EmployeeId)).eq(employee_id))
        .order_by(
            (GachaAttempts::Table, GachaAttempts::AttemptNumber),
            Order::Desc,
        )
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

    Ok(rows
        .iter()
        .map(|row| GachaAttempt {
            attempt_id: row.get("attempt_id"),
            employee_id: row.get("employee_id"),
            attempt_number: row.get("attempt_number"),
            goods_id: row.get("goods_id"),
            goods_name: row.get("name"),
            points_spent: row.get("points_spent"),
            created_at: row.get("created_at"),
        })
        .collect())
}
