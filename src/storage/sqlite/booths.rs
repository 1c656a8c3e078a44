//! SQLite access to `booths`, `visits` and `evaluations`.

use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection};

use crate::booths::{Booth, EvaluationScores, Visit};
use crate::storage::schema::{Booths, Evaluations, Visits};
use crate::storage::Result;

/// Insert a booth unless one with the same ID exists. Returns whether it was inserted.
pub async fn insert(conn: &mut SqliteConnection, booth: &Booth) -> Result<bool> {
    let query = Query::insert()
        .into_table(Booths::Table)
        .columns([
            Booths::BoothId,
            Booths::Name,
            Booths::Zone,
            Booths::Floor,
            Booths::OwnerEmployeeId,
            Booths::VisitorCount,
        ])
        .values_panic([
            booth.booth_id.as_str().into(),
            booth.name.as_str().into(),
            booth.zone.as_str().into(),
            booth.floor.as_str().into(),
            booth.owner_employee_id.clone().into(),
            booth.visitor_count.into(),
        ])
        .on_conflict(OnConflict::column(Booths::BoothId).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find(conn: &mut SqliteConnection, booth_id: &str) -> Result<Option<Booth>> {
    let query = Query::select()
        .columns([
            Booths::BoothId,
            Booths::Name,
            Booths::Zone,
            Booths::Floor,
            Booths::OwnerEmployeeId,
            Booths::VisitorCount,
        ])
        .from(Booths::Table)
        .and_where(Expr::col(Booths::BoothId).eq(booth_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;

    Ok(row.map(|row| Booth {
        booth_id: row.get("booth_id"),
        name: row.get("name"),
        zone: row.get("zone"),
        floor: row.get("floor"),
        owner_employee_id: row.get("owner_employee_id"),
        visitor_count: row.get("visitor_count"),
    }))
}

/// Bump the visitor count and return the new value.
pub async fn increment_visitor_count(conn: &mut SqliteConnection, booth_id: &str) -> Result<i64> {
    let update = Query::update()
        .table(Booths::Table)
        .value(Booths::VisitorCount, Expr::col(Booths::VisitorCount).add(1))
        .and_where(Expr::col(Booths::BoothId).eq(booth_id))
        .to_string(SqliteQueryBuilder);
    sqlx::query(&update).execute(&mut *conn).await?;

    let select = Query::select()
        .column(Booths::VisitorCount)
        .from(Booths::Table)
        .and_where(Expr::col(Booths::BoothId).eq(booth_id))
        .to_string(SqliteQueryBuilder);
    let row = sqlx::query(&select).fetch_one(&mut *conn).await?;
    Ok(row.get("visitor_count"))
}

pub async fn visit_exists(
    conn: &mut SqliteConnection,
    employee_id: &str,
    booth_id: &str,
) -> Result<bool> {
    let query = Query::select()
        .expr(Expr::col(Visits::BoothId).count())
        .from(Visits::Table)
        .and_where(Expr::col(Visits::EmployeeId).eq(employee_id))
        .and_where(Expr::col(Visits::BoothId).eq(booth_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}

pub async fn insert_visit(conn: &mut SqliteConnection, visit: &Visit) -> Result<()> {
    let query = Query::insert()
        .into_table(Visits::Table)
        .columns([
            Visits::EmployeeId,
            Visits::BoothId,
            Visits::PointsEarned,
            Visits::VisitedAt,
        ])
        .values_panic([
            visit.employee_id.as_str().into(),
            visit.booth_id.as_str().into(),
            visit.points_earned.into(),
            visit.visited_at.as_str().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

pub async fn count_visits(conn: &mut SqliteConnection, employee_id: &str) -> Result<i64> {
    let query = Query::select()
        .expr(Expr::col(Visits::BoothId).count())
        .from(Visits::Table)
        .and_where(Expr::col(Visits::EmployeeId).eq(employee_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    Ok(row.get(0))
}

pub async fn evaluation_exists(
    conn: &mut SqliteConnection,
    employee_id: &str,
    booth_id: &str,
) -> Result<bool> {
    let query = Query::select()
        .expr(Expr::col(Evaluations::BoothId).count())
        .from(Evaluations::Table)
        .and_where(Expr::col(Evaluations::EmployeeId).eq(employee_id))
        .and_where(Expr::col(Evaluations::BoothId).eq(booth_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}

pub async fn insert_evaluation(
    conn: &mut SqliteConnection,
    employee_id: &str,
    booth_id: &str,
    scores: &EvaluationScores,
) -> Result<()> {
    let [first, best, different, number_one, gap, global] = scores.0;
    let query = Query::insert()
        .into_table(Evaluations::Table)
        .columns([
            Evaluations::EmployeeId,
            Evaluations::BoothId,
            Evaluations::ScoreFirst,
            Evaluations::ScoreBest,
            Evaluations::ScoreDifferent,
            Evaluations::ScoreNumberOne,
            Evaluations::ScoreGap,
            Evaluations::ScoreGlobal,
            Evaluations::TotalScore,
            Evaluations::CreatedAt,
        ])
        .values_panic([
            employee_id.into(),
            booth_id.into(),
            first.into(),
            best.into(),
            different.into(),
            number_one.into(),
            gap.into(),
            global.into(),
            scores.total().into(),
            crate::storage::now().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}
