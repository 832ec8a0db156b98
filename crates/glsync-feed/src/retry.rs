use std::time::Duration;

use glsync_core::{BackoffStrategy, Result, RetrySettings};

/// Retries retryable feed errors with a bounded backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    settings: RetrySettings,
}

impl RetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    /// A policy that never retries.
    pub fn never() -> Self {
        Self::new(RetrySettings {
            max_attempts: 1,
            ..RetrySettings::default()
        })
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        request = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        compute_backoff(
            self.settings.base_delay,
            attempt,
            self.settings.strategy,
            self.settings.max_delay,
        )
    }
}

fn compute_backoff(
    base: Duration,
    attempt: u32,
    strategy: BackoffStrategy,
    cap: Duration,
) -> Duration {
    let delay = match strategy {
        BackoffStrategy::None => base,
        BackoffStrategy::Linear => base.saturating_mul(attempt),
        BackoffStrategy::Exponential => {
            base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        }
    };
    delay.min(cap)
}
