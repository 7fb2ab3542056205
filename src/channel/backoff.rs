use std::time::Duration;

/// Exponential reconnect backoff: starts at `base`, doubles per failed
/// attempt, capped at `max`. Reset on a successful connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        self.current
    }

    /// Record a failed attempt, lengthening the next delay.
    pub fn advance(&mut self) {
        self.current = (self.current * 2).min(self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
