//! Backoff schedule for throttled provider calls.

use std::time::Duration;

/// How many times to try a throttled call and how long to wait in between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the first retry. Doubles each retry after that.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Extra random wait of up to `factor * delay`, added on top.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`, plus jitter.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (retry - 1).min(16);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let unit = f64::from(random_u32()) / f64::from(u32::MAX);
        delay + delay.mul_f64(self.jitter_factor * unit)
    }
}

/// Cheap per-thread xorshift; jitter only needs to spread callers apart.
fn random_u32() -> u32 {
    use std::cell::Cell;
    use std::time::SystemTime;

    thread_local! {
        static STATE: Cell<u32> = Cell::new(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.subsec_nanos() | 1)
                .unwrap_or(0x9E37_79B9)
        );
    }

    STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state.set(x);
        x
    })
}
