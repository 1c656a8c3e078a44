//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use expo_rewards::booths::Booth;
use expo_rewards::config::Config;
use expo_rewards::gacha::GoodsStock;
use expo_rewards::ledger::{self, LedgerReason};
use expo_rewards::storage::StorageConfig;
use expo_rewards::RewardEngine;

/// Engine on a private in-memory database.
pub async fn memory_engine() -> RewardEngine {
    RewardEngine::open(&Config::for_test())
        .await
        .expect("in-memory engine should open")
}

/// Engine on a file database with a multi-connection pool.
///
/// The directory lives as long as the returned guard.
pub async fn file_engine() -> (Arc<RewardEngine>, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = Config {
        storage: StorageConfig {
            path: dir.path().join("rewards.db").to_string_lossy().into_owned(),
            max_connections: 8,
            busy_timeout_ms: 10_000,
        },
        ..Config::for_test()
    };
    let engine = RewardEngine::open(&config)
        .await
        .expect("file engine should open");
    (Arc::new(engine), dir)
}

pub async fn add_booth(engine: &RewardEngine, booth_id: &str) {
    engine
        .register_booth(&Booth::new(
            booth_id,
            format!("Booth {booth_id}"),
            "HALL",
            "B1F",
        ))
        .await
        .expect("booth should register");
}

pub async fn add_goods(engine: &RewardEngine, goods_id: &str, stock: i64) {
    engine
        .register_goods(&GoodsStock::new(goods_id, format!("Goods {goods_id}"), stock))
        .await
        .expect("goods should register");
}

/// Credit points outside any booth flow.
pub async fn fund(engine: &RewardEngine, employee_id: &str, points: i64) {
    let mut conn = engine.pool().acquire().await.expect("connection");
    ledger::append(
        &mut conn,
        employee_id,
        points,
        LedgerReason::Visit,
        "test-funding",
    )
    .await
    .expect("funding should apply");
}
