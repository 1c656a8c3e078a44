//! Reward engine error taxonomy.
//!
//! Business rejections (`InsufficientBalance`, `OutOfStock`, ...) are expected
//! conditions and carry enough detail for a user-facing message. Only
//! `ConcurrencyConflict` is transient.

use crate::storage::StorageError;

/// Result type for reward engine operations.
pub type Result<T> = std::result::Result<T, RewardError>;

#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown booth: {0}")]
    UnknownBooth(String),

    #[error("Unknown mission: {0}")]
    UnknownMission(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Gacha attempt limit of {limit} reached")]
    AttemptLimitExceeded { limit: i64 },

    #[error("All goods are out of stock")]
    OutOfStock,

    #[error("Mission {0} is still locked")]
    NotUnlocked(String),

    #[error("Mission {0} is already completed")]
    AlreadyCompleted(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl RewardError {
    /// Stable machine-readable code for client-facing responses.
    pub fn code(&self) -> &'static str {
        match self {
            RewardError::Validation(_) => "INVALID_INPUT",
            RewardError::UnknownUser(_)
            | RewardError::UnknownBooth(_)
            | RewardError::UnknownMission(_) => "ENTITY_NOT_FOUND",
            RewardError::InsufficientBalance { .. } => "POINT_INSUFFICIENT",
            RewardError::AttemptLimitExceeded { .. } => "GACHA_MAX_REACHED",
            RewardError::OutOfStock => "GOODS_OUT_OF_STOCK",
            RewardError::NotUnlocked(_) => "MISSION_LOCKED",
            RewardError::AlreadyCompleted(_) => "MISSION_ALREADY_COMPLETED",
            RewardError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            RewardError::Storage(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RewardError::ConcurrencyConflict(_))
    }
}

impl From<StorageError> for RewardError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Busy(msg) => RewardError::ConcurrencyConflict(msg),
            other => RewardError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for RewardError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::from(err).into()
    }
}
