//! Delay schedules between failed reconnect attempts.

use crate::backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long a reconnect cycle waits after each failed attempt.
///
/// The first attempt of a cycle runs immediately. After the k-th failure
/// the cycle sleeps for [`delay_for_attempt(k - 1)`](Self::delay_for_attempt)
/// before trying again.
#[derive(Clone)]
pub enum ReconnectPolicy {
    /// Same delay after every failure.
    Fixed(FixedInterval),
    /// Doubling delay, capped.
    Exponential(ExponentialBackoff),
    /// Doubling delay with jitter, capped. Spreads out reconnects of many
    /// clients that lost the same server.
    ExponentialRandom(ExponentialRandomBackoff),
    /// Any user-provided schedule.
    Custom(Arc<dyn IntervalFunction>),
}

impl ReconnectPolicy {
    /// Waits `delay` after every failed attempt.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed(FixedInterval::new(delay))
    }

    /// Waits `initial_delay` after the first failure, doubling after each
    /// further failure up to `max_delay`.
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential(
            ExponentialBackoff::new(initial_delay)
                .multiplier(2.0)
                .max_interval(max_delay),
        )
    }

    /// Like [`exponential`](Self::exponential), with each delay drawn
    /// uniformly from `delay * (1 ± randomization_factor)` and clamped to
    /// `max_delay`.
    pub fn exponential_random(
        initial_delay: Duration,
        max_delay: Duration,
        randomization_factor: f64,
    ) -> Self {
        Self::ExponentialRandom(
            ExponentialRandomBackoff::new(initial_delay, randomization_factor)
                .multiplier(2.0)
                .max_interval(max_delay),
        )
    }

    /// Uses `interval` as the schedule.
    pub fn custom<I>(interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        Self::Custom(Arc::new(interval))
    }

    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let schedule: &dyn IntervalFunction = match self {
            Self::Fixed(interval) => interval,
            Self::Exponential(backoff) => backoff,
            Self::ExponentialRandom(backoff) => backoff,
            Self::Custom(interval) => &**interval,
        };
        schedule.next_interval(attempt)
    }
}

impl Default for ReconnectPolicy {
    /// 100ms doubling to 30s.
    fn default() -> Self {
        Self::exponential(Duration::from_millis(100), Duration::from_secs(30))
    }
}

impl fmt::Debug for ReconnectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(interval) => f.debug_tuple("Fixed").field(interval).finish(),
            Self::Exponential(backoff) => f.debug_tuple("Exponential").field(backoff).finish(),
            Self::ExponentialRandom(backoff) => {
                f.debug_tuple("ExponentialRandom").field(backoff).finish()
            }
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}
