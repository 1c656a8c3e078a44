//! expo-rewards - points economy for a fair companion app
//!
//! Attendees earn points by visiting and evaluating booths and by completing
//! missions, and spend them on a limited gacha and on booth entry fees. Every
//! balance change is an entry in an append-only, idempotent ledger; the
//! engine runs each action in one SQLite write transaction so concurrent
//! requests from the same user can never double-spend or double-reward.

pub mod booths;
pub mod config;
pub mod engine;
pub mod error;
pub mod gacha;
pub mod ledger;
pub mod missions;
pub mod seed;
pub mod storage;
pub mod users;
pub mod utils;

pub use engine::RewardEngine;
pub use error::{Result, RewardError};

#[cfg(test)]
mod test_utils;
