//! Retry utilities: backoff builders for transient write conflicts.
//!
//! Uses `backon` for exponential backoff with jitter. Only errors reporting
//! `is_retryable()` are retried; business rejections fail on the first try.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::GachaConfig;

/// Backoff for gacha draws that lost a write race.
///
/// `conflict_attempts` counts the first try, so the builder allows one fewer
/// retry. Jitter keeps colliding callers from retrying in lockstep.
pub fn gacha_backoff(config: &GachaConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.backoff_min_ms))
        .with_max_delay(Duration::from_millis(
            config.backoff_max_ms.max(config.backoff_min_ms),
        ))
        .with_max_times(config.conflict_attempts.saturating_sub(1))
        .with_jitter()
}

#[cfg(test)]
mod tests;
