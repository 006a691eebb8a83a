use std::time::Duration;

use rand::Rng;

/// Escalating reconnect delay: `min(limit, initial * multiplier^attempt) + rand(0..=jitter)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub limit: Duration,
    pub jitter: Duration,
}

impl BackoffPolicy {
    /// Delay for `attempt` without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        let limit = self.limit.as_millis() as f64;
        let capped = if raw.is_nan() { limit } else { raw.min(limit) };
        Duration::from_millis(capped.max(0.0).round() as u64)
    }

    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// The two retry policies; which one applies depends on whether the context
/// being retried is the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffScheduler {
    pub default: BackoffPolicy,
    pub current_context: BackoffPolicy,
}

impl BackoffScheduler {
    pub fn policy(&self, is_current: bool) -> &BackoffPolicy {
        if is_current {
            &self.current_context
        } else {
            &self.default
        }
    }

    pub fn next_delay(&self, attempt: u32, is_current: bool) -> Duration {
        self.policy(is_current).next_delay(attempt)
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        let initial = Duration::from_secs(1);
        let jitter = Duration::from_millis(300);
        Self {
            default: BackoffPolicy { initial, multiplier: 2.0, limit: Duration::from_secs(60), jitter },
            current_context: BackoffPolicy { initial, multiplier: 1.2, limit: Duration::from_secs(10), jitter },
        }
    }
}
