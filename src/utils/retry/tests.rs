use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use backon::{BackoffBuilder, Retryable};

use crate::error::RewardError;

fn fast_config(conflict_attempts: usize) -> GachaConfig {
    GachaConfig {
        conflict_attempts,
        backoff_min_ms: 1,
        backoff_max_ms: 2,
        ..GachaConfig::default()
    }
}

async fn count_calls(config: &GachaConfig, error: fn() -> RewardError) -> usize {
    let calls = AtomicUsize::new(0);
    let result: Result<(), RewardError> = (|| async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(error())
    })
    .retry(gacha_backoff(config))
    .when(RewardError::is_retryable)
    .await;
    assert!(result.is_err());
    calls.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_conflicts_retry_up_to_configured_attempts() {
    let calls = count_calls(&fast_config(3), || {
        RewardError::ConcurrencyConflict("database is locked".to_string())
    })
    .await;
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn test_business_errors_are_not_retried() {
    let calls = count_calls(&fast_config(3), || RewardError::OutOfStock).await;
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_single_attempt_disables_retry() {
    let calls = count_calls(&fast_config(1), || {
        RewardError::ConcurrencyConflict("busy".to_string())
    })
    .await;
    assert_eq!(calls, 1);
}

#[test]
fn test_inverted_bounds_clamp_max_up_to_min() {
    let config = GachaConfig {
        conflict_attempts: 4,
        backoff_min_ms: 50,
        backoff_max_ms: 10,
        ..GachaConfig::default()
    };

    let delays: Vec<Duration> = gacha_backoff(&config).build().collect();

    assert_eq!(delays.len(), 3);
    for delay in delays {
        // Jitter adds at most one extra base delay.
        assert!(delay >= Duration::from_millis(50), "{delay:?}");
        assert!(delay < Duration::from_millis(100), "{delay:?}");
    }
}
