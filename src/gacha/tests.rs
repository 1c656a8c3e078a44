use super::*;
use crate::config::GachaConfig;
use crate::ledger::{self, LedgerReason};
use crate::test_utils::{insert_goods, insert_user, memory_conn};

fn goods(id: &str, remaining: i64) -> GoodsStock {
    GoodsStock {
        goods_id: id.to_string(),
        name: id.to_string(),
        total_stock: remaining.max(1),
        remaining_stock: remaining,
    }
}

fn seeded_draw() -> GachaDraw {
    GachaDraw::new(&GachaConfig {
        seed: Some(7),
        ..GachaConfig::default()
    })
}

async fn fund(conn: &mut sqlx::SqliteConnection, employee_id: &str, points: i64) {
    ledger::append(conn, employee_id, points, LedgerReason::Visit, "funding")
        .await
        .unwrap();
}

#[test]
fn test_pick_weighted_intervals_follow_remaining_stock() {
    let stock = vec![goods("A", 3), goods("B", 1)];
    let picks: Vec<&str> = (0..total_remaining(&stock))
        .map(|roll| pick_weighted(&stock, roll).unwrap().goods_id.as_str())
        .collect();
    assert_eq!(picks, ["A", "A", "A", "B"]);
}

#[test]
fn test_pick_weighted_skips_sold_out_goods() {
    let stock = vec![goods("A", 0), goods("B", 2), goods("C", 0)];
    assert_eq!(total_remaining(&stock), 2);
    assert_eq!(pick_weighted(&stock, 0).unwrap().goods_id, "B");
    assert_eq!(pick_weighted(&stock, 1).unwrap().goods_id, "B");
}

#[test]
fn test_pick_weighted_out_of_range_roll() {
    let stock = vec![goods("A", 2)];
    assert!(pick_weighted(&stock, 2).is_none());
    assert!(pick_weighted(&[], 0).is_none());
}

#[test]
fn test_seeded_draws_are_reproducible() {
    let a = seeded_draw();
    let b = seeded_draw();
    let rolls_a: Vec<u64> = (0..20).map(|_| a.roll(600)).collect();
    let rolls_b: Vec<u64> = (0..20).map(|_| b.roll(600)).collect();
    assert_eq!(rolls_a, rolls_b);
    assert!(rolls_a.iter().all(|r| *r < 600));
}

#[tokio::test]
async fn test_attempt_spends_points_and_takes_stock() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    insert_goods(&mut conn, "GOODS-01", 5).await;
    fund(&mut conn, "E001", 50).await;

    let result = seeded_draw().attempt(&mut conn, "E001").await.unwrap();

    assert_eq!(result.goods_id, "GOODS-01");
    assert_eq!(result.remaining_points, 10);
    assert_eq!(result.attempt_number, 1);
    let stock = store::list(&mut conn).await.unwrap();
    assert_eq!(stock[0].remaining_stock, 4);
    assert_eq!(store::count_awarded(&mut conn, "GOODS-01").await.unwrap(), 1);
}

#[tokio::test]
async fn test_attempt_numbers_count_up_to_limit() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    insert_goods(&mut conn, "GOODS-01", 10).await;
    fund(&mut conn, "E001", 200).await;
    let draw = seeded_draw();

    let first = draw.attempt(&mut conn, "E001").await.unwrap();
    let second = draw.attempt(&mut conn, "E001").await.unwrap();
    let third = draw.attempt(&mut conn, "E001").await.unwrap_err();

    assert_eq!(first.attempt_number, 1);
    assert_eq!(second.attempt_number, 2);
    assert!(matches!(third, RewardError::AttemptLimitExceeded { limit: 2 }));
    assert_eq!(ledger::balance(&mut conn, "E001").await.unwrap(), 120);
}

#[tokio::test]
async fn test_attempt_without_points_fails_before_touching_stock() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    insert_goods(&mut conn, "GOODS-01", 1).await;

    let err = seeded_draw().attempt(&mut conn, "E001").await.unwrap_err();

    assert!(matches!(
        err,
        RewardError::InsufficientBalance {
            required: 40,
            available: 0
        }
    ));
    assert_eq!(store::list(&mut conn).await.unwrap()[0].remaining_stock, 1);
    assert_eq!(store::count_attempts(&mut conn, "E001").await.unwrap(), 0);
}

#[tokio::test]
async fn test_attempt_with_empty_stock_is_out_of_stock() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    insert_goods(&mut conn, "GOODS-01", 0).await;
    fund(&mut conn, "E001", 40).await;

    let err = seeded_draw().attempt(&mut conn, "E001").await.unwrap_err();

    assert!(matches!(err, RewardError::OutOfStock));
    assert_eq!(ledger::balance(&mut conn, "E001").await.unwrap(), 40);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let (_pool, mut conn) = memory_conn().await;
    insert_user(&mut conn, "E001").await;
    insert_goods(&mut conn, "GOODS-01", 10).await;
    fund(&mut conn, "E001", 80).await;
    let draw = seeded_draw();
    draw.attempt(&mut conn, "E001").await.unwrap();
    draw.attempt(&mut conn, "E001").await.unwrap();

    let history = draw.history(&mut conn, "E001").await.unwrap();

    let numbers: Vec<i64> = history.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, [2, 1]);
    assert!(history.iter().all(|a| a.goods_name == "Goods GOODS-01"));
    assert!(history.iter().all(|a| a.points_spent == 40));
}
