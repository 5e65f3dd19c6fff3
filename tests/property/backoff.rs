//! Property tests for reconnect backoff.
//!
//! Invariants tested:
//! - Exponential delays never decrease
//! - Delays never exceed the configured cap
//! - Jittered delays stay within the randomization band and the cap

use proptest::prelude::*;
use self_healing_connection::{
    ExponentialBackoff, ExponentialRandomBackoff, IntervalFunction, ReconnectPolicy,
};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: exponential delays are non-decreasing up to the cap
    #[test]
    fn exponential_is_monotonic_and_capped(
        initial_ms in 1u64..1_000,
        max_ms in 1u64..60_000,
        multiplier in 1.0f64..4.0,
    ) {
        let max = Duration::from_millis(max_ms);
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms))
            .multiplier(multiplier)
            .max_interval(max);

        let delays: Vec<Duration> = (0..64).map(|attempt| backoff.next_interval(attempt)).collect();
        for pair in delays.windows(2) {
            prop_assert!(pair[0] <= pair[1], "decreased: {:?} -> {:?}", pair[0], pair[1]);
        }
        for delay in &delays {
            prop_assert!(*delay <= max);
        }
    }

    /// Property: the policy wrapper never exceeds its cap
    #[test]
    fn policy_respects_cap(
        initial_ms in 1u64..1_000,
        max_ms in 1u64..10_000,
        attempt in 0usize..1_000,
    ) {
        let policy = ReconnectPolicy::exponential(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
        );
        prop_assert!(policy.delay_for_attempt(attempt) <= Duration::from_millis(max_ms));
    }

    /// Property: jitter stays within [d(1 - f), d(1 + f)] and below the cap
    #[test]
    fn jitter_is_bounded(
        initial_ms in 10u64..1_000,
        factor in 0.0f64..1.0,
        attempt in 0usize..8,
    ) {
        let max = Duration::from_secs(3_600);
        let exact = ExponentialBackoff::new(Duration::from_millis(initial_ms)).max_interval(max);
        let jittered = ExponentialRandomBackoff::new(Duration::from_millis(initial_ms), factor)
            .max_interval(max);

        let base = exact.next_interval(attempt).as_secs_f64();
        let delay = jittered.next_interval(attempt).as_secs_f64();

        prop_assert!(delay >= base * (1.0 - factor) - 1e-3);
        prop_assert!(delay <= base * (1.0 + factor) + 1e-3);
        prop_assert!(delay <= max.as_secs_f64());
    }
}
