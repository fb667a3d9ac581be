use std::time::Duration;

/// How a simulated user reacts to a failed discovery call.
///
/// Failures are counted per streak; a successful discovery resets the streak.
/// Delay doubles with each consecutive failure, capped at `max_delay`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryRetry {
    /// `None` retries forever (the run deadline, if any, still applies).
    pub max_consecutive_failures: Option<u32>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for DiscoveryRetry {
    fn default() -> Self {
        Self {
            max_consecutive_failures: None,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl DiscoveryRetry {
    pub fn bounded(max_consecutive_failures: u32) -> Self {
        Self {
            max_consecutive_failures: Some(max_consecutive_failures),
            ..Self::default()
        }
    }

    /// True once `consecutive` failures in a row exhaust the budget.
    pub fn exhausted(&self, consecutive: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|max| consecutive >= max)
    }

    /// Delay after the `consecutive`-th failure in a row (1-based).
    pub fn delay_for(&self, consecutive: u32) -> Duration {
        let exp = consecutive.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exp)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}
