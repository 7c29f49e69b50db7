//! Tests for retry policy and acquisition options

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{AcquireOptions, RetryPolicy};

#[test]
fn test_default_policy_is_five_fixed_retries() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries(), 5);
    assert_eq!(policy.max_attempts(), 6);
    for attempt in 0..5 {
        assert_eq!(policy.delay_for(attempt), Duration::from_secs(1));
    }
    assert_eq!(policy.multiplier(), 1.0);
}

#[test]
fn test_backoff_growth_is_capped() {
    let policy = RetryPolicy::new(10, Duration::from_millis(100))
        .with_backoff(2.0, Duration::from_millis(1000));

    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(30), Duration::from_millis(1000));
}

#[test]
fn test_backoff_never_shrinks_delays() {
    let policy = RetryPolicy::new(3, Duration::from_millis(500))
        .with_backoff(0.5, Duration::from_millis(100));

    assert_eq!(policy.multiplier(), 1.0);
    assert_eq!(policy.max_delay(), Duration::from_millis(500));
    assert_eq!(policy.delay_for(2), Duration::from_millis(500));
}

#[test]
fn test_no_retry_policy() {
    let policy = RetryPolicy::no_retry();
    assert_eq!(policy.max_attempts(), 1);
    assert_eq!(policy.delay_for(0), Duration::ZERO);
}

#[test]
fn test_policy_serialization() {
    let policy = RetryPolicy::new(2, Duration::from_millis(750));
    let json = serde_json::to_string(&policy).expect("serialize");
    let deserialized: RetryPolicy = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(policy, deserialized);
}

#[test]
fn test_default_options_are_empty() {
    let options = AcquireOptions::new();
    assert!(options.retry().is_none());
    assert!(options.deadline().is_none());
    assert!(options.cancellation().is_none());
    assert!(!options.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_options_timeout_sets_deadline() {
    let before = tokio::time::Instant::now();
    let options = AcquireOptions::new().with_timeout(Duration::from_secs(3));
    assert_eq!(options.deadline(), Some(before + Duration::from_secs(3)));
}

#[test]
fn test_options_track_cancellation() {
    let token = CancellationToken::new();
    let options = AcquireOptions::new().with_cancellation(token.clone());
    assert!(!options.is_cancelled());
    token.cancel();
    assert!(options.is_cancelled());
}
