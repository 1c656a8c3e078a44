//! expo-rewards-seed: prepare a fair database
//!
//! Opens (and if needed creates) the reward store named by the configuration
//! and loads the demo users, booths and prizes. Safe to rerun.
//!
//! ## Configuration
//! - `--config <path>` or EXPO_REWARDS_CONFIG: YAML configuration file
//! - EXPO_REWARDS__STORAGE__PATH: database file
//! - EXPO_REWARDS_LOG: tracing filter (default "info")

use tracing::{error, info};

use expo_rewards::config::Config;
use expo_rewards::engine::RewardEngine;
use expo_rewards::seed::seed_demo_data;
use expo_rewards::utils::bootstrap::{init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(path = %config.storage.path, "Starting expo-rewards-seed");

    let engine = RewardEngine::open(&config).await?;
    let report = seed_demo_data(&engine).await?;

    info!(
        users = report.users,
        booths = report.booths,
        goods = report.goods,
        "Seeding finished"
    );

    let drifted = engine.audit_all().await?;
    if !drifted.is_empty() {
        error!(users = drifted.len(), "Ledger audit found drifted balances");
    }
    engine.pool().close().await;
    Ok(())
}
