use std::time::Duration;

/// Default delay between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How the connector behaves when the instrument service is not reachable.
///
/// The default reproduces the classic behaviour of the control software's
/// clients: retry every second, forever. Bounded and exponential variants
/// exist for callers that need to give up or back off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after every failed attempt. `1` keeps it fixed.
    pub multiplier: u32,
    /// Maximum number of attempts. `None` retries until success.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

impl ReconnectPolicy {
    /// Retry forever with a constant delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1,
            max_attempts: None,
        }
    }

    /// Retry forever, doubling the delay up to `max_delay`.
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: 2,
            max_attempts: None,
        }
    }

    /// Limit the total number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn should_retry(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay = match self.multiplier.checked_pow(exponent) {
            Some(factor) => self.initial_delay.saturating_mul(factor),
            None => self.max_delay,
        };
        delay.min(self.max_delay)
    }
}
