//! Monitoring loop configuration

use std::time::Duration;

use crate::escalation::EscalationPolicy;

/// Default cadence between cycle starts.
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(45);
/// Default bound on a cycle's capture+judge phase. Kept below the sample
/// interval so a hung judge call cannot starve more than one tick.
const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one monitoring session's control loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Fixed interval between the start of consecutive cycles when idle.
    /// A cycle outliving the interval causes the next tick to be dropped,
    /// never queued.
    pub sample_interval: Duration,
    /// Overall timeout for a cycle's capture+judge phase; an expired cycle
    /// is abandoned as a no-verdict cycle.
    pub cycle_timeout: Duration,
    /// Score deltas and threshold table.
    pub policy: EscalationPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            policy: EscalationPolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_interval, Duration::from_secs(45));
        assert_eq!(config.cycle_timeout, Duration::from_secs(30));
        assert!(config.cycle_timeout < config.sample_interval);
    }

    #[test]
    fn test_builders() {
        let config = MonitorConfig::new()
            .with_sample_interval(Duration::from_secs(10))
            .with_cycle_timeout(Duration::from_secs(5));
        assert_eq!(config.sample_interval, Duration::from_secs(10));
        assert_eq!(config.cycle_timeout, Duration::from_secs(5));
    }
}
