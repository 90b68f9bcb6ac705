use std::time::Duration;

/// Exponential backoff shared by failed polls and not-yet-complete waits.
///
/// The delay for attempt `n` is `initial * 2^(n-1)`, clamped to `max`.
/// There is no jitter and the attempt counter is never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn from_secs(initial_secs: u64, max_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(initial_secs),
            Duration::from_secs(max_secs),
        )
    }

    /// Delay before the next attempt. Attempts below 1 are treated as 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        2u32.checked_pow(exponent)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_secs(5, 60)
    }
}
