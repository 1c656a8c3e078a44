//! Concurrent access against a file-backed store.
//!
//! Run with: cargo test --test concurrency

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use expo_rewards::{RewardEngine, RewardError};

use common::{add_booth, add_goods, file_engine, fund};

async fn draw_concurrently(
    engine: &Arc<RewardEngine>,
    employee_ids: Vec<String>,
) -> Vec<Result<expo_rewards::gacha::GachaResult, RewardError>> {
    let handles = employee_ids.into_iter().map(|employee_id| {
        let engine = Arc::clone(engine);
        tokio::spawn(async move { engine.spend_on_gacha(&employee_id).await })
    });
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("draw task should not panic"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_tap_gacha_spends_once() {
    let (engine, _dir) = file_engine().await;
    engine.enroll("E001", "Kim").await.unwrap();
    add_goods(&engine, "GOODS-01", 10).await;
    fund(&engine, "E001", 40).await;

    let results = draw_concurrently(&engine, vec!["E001".to_string(); 3]).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "{results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, RewardError::InsufficientBalance { .. }),
            "unexpected {err:?}"
        );
    }
    assert_eq!(engine.balance("E001").await.unwrap(), 0);
    assert_eq!(engine.gacha_history("E001").await.unwrap().len(), 1);
    assert!(engine.audit("E001").await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scarce_stock_is_never_oversold() {
    let (engine, _dir) = file_engine().await;
    add_goods(&engine, "GOODS-01", 2).await;
    add_goods(&engine, "GOODS-02", 3).await;
    let users: Vec<String> = (1..=10).map(|i| format!("E{i:03}")).collect();
    for user in &users {
        engine.enroll(user, "Attendee").await.unwrap();
        fund(&engine, user, 40).await;
    }

    let results = draw_concurrently(&engine, users.clone()).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|r| matches!(r, Err(RewardError::OutOfStock)))
        .count();
    assert_eq!(successes, 5, "{results:?}");
    assert_eq!(sold_out, 5, "{results:?}");

    for goods in engine.goods().await.unwrap() {
        assert_eq!(goods.remaining_stock, 0);
        let awarded = engine.awarded(&goods.goods_id).await.unwrap();
        assert_eq!(goods.total_stock, awarded);
    }
    assert!(engine.audit_all().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_scans_award_once() {
    let (engine, _dir) = file_engine().await;
    engine.enroll("E001", "Kim").await.unwrap();
    add_booth(&engine, "BOOTH-01").await;

    let handles = (0..5).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.record_visit("E001", "BOOTH-01").await })
    });
    let outcomes: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("scan task should not panic").unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| !o.duplicate).count(), 1);
    assert!(outcomes.iter().all(|o| o.balance == 10));
    assert_eq!(engine.ledger("E001").await.unwrap().len(), 1);
    assert_eq!(engine.booth("BOOTH-01").await.unwrap().visitor_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_draws_respect_attempt_limit() {
    let (engine, _dir) = file_engine().await;
    engine.enroll("E001", "Kim").await.unwrap();
    add_goods(&engine, "GOODS-01", 10).await;
    fund(&engine, "E001", 200).await;
    engine.spend_on_gacha("E001").await.unwrap();

    let results = draw_concurrently(&engine, vec!["E001".to_string(); 3]).await;

    let successes: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(successes.len(), 1, "{results:?}");
    assert_eq!(successes[0].attempt_number, 2);
    let limited = results
        .iter()
        .filter(|r| matches!(r, Err(RewardError::AttemptLimitExceeded { limit: 2 })))
        .count();
    assert_eq!(limited, 2, "{results:?}");
    assert_eq!(engine.gacha_history("E001").await.unwrap().len(), 2);
    assert_eq!(engine.balance("E001").await.unwrap(), 200 - 2 * 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_requests_release_the_write_lock() {
    let (engine, _dir) = file_engine().await;
    engine.enroll("E001", "Kim").await.unwrap();
    for i in 1..=20u64 {
        let booth_id = format!("BOOTH-{i:02}");
        add_booth(&engine, &booth_id).await;
        let _ = tokio::time::timeout(
            Duration::from_micros(5 * i),
            engine.record_visit("E001", &booth_id),
        )
        .await;
    }

    // Each write must take the lock well inside the busy timeout.
    let enrolled =
        tokio::time::timeout(Duration::from_secs(2), engine.enroll("E002", "Lee")).await;
    enrolled.expect("write lock still held").unwrap();
    let visit = tokio::time::timeout(
        Duration::from_secs(2),
        engine.record_visit("E002", "BOOTH-01"),
    )
    .await
    .expect("write lock still held")
    .unwrap();
    assert_eq!(visit.balance, 10);
    assert!(engine.audit_all().await.unwrap().is_empty());
}
