use std::time::Duration;
use typed_builder::TypedBuilder;
use zwave_core::log::Loglevel;
use zwave_core::security::DEFAULT_NONCE_LIFETIME;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Tunables for the whole engine. All durations are wall time.
#[derive(Debug, Clone, TypedBuilder)]
pub struct EngineOptions {
    /// Poll interval for wall powered listeners
    #[builder(default = 10 * MINUTE)]
    pub poll_interval: Duration,
    /// Random deviation of the listener poll interval, in percent
    #[builder(default = 10)]
    pub poll_jitter_percent: u32,
    /// Frequent listeners are polled at a random interval in this range
    #[builder(default = (30 * MINUTE, 60 * MINUTE))]
    pub frequent_poll_range: (Duration, Duration),
    /// Delay before the first retry after an unanswered poll. Doubles with every timeout.
    #[builder(default = MINUTE)]
    pub poll_backoff_initial: Duration,
    /// The poll back-off is capped at this multiple of the initial delay
    #[builder(default = 5)]
    pub poll_backoff_cap_factor: u32,
    /// Consecutive unanswered polls before a capability is considered failed
    #[builder(default = 3)]
    pub error_threshold: u32,

    #[builder(default = Duration::from_secs(30))]
    pub discovery_backoff_initial: Duration,
    #[builder(default = Duration::from_secs(150))]
    pub discovery_backoff_max: Duration,

    #[builder(default = DEFAULT_NONCE_LIFETIME)]
    pub nonce_lifetime: Duration,
    #[builder(default = Duration::from_millis(1600))]
    pub ack_timeout: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub reply_timeout: Duration,
    /// How long a battery device is kept awake before it is sent back to sleep
    #[builder(default = Duration::from_secs(10))]
    pub wake_window: Duration,

    /// Auto-configuration is re-sent after this period plus a random part of `auto_config_jitter`
    #[builder(default = 24 * HOUR)]
    pub auto_config_period: Duration,
    #[builder(default = 2 * HOUR)]
    pub auto_config_jitter: Duration,

    #[builder(default = Loglevel::Info)]
    pub log_level: Loglevel,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineOptions {
    /// Delay before the next poll after the given number of consecutive timeouts
    pub fn poll_backoff(&self, timeouts: u32) -> Duration {
        backoff(
            self.poll_backoff_initial,
            timeouts,
            self.poll_backoff_initial * self.poll_backoff_cap_factor,
        )
    }

    /// Delay before the next discovery attempt after the given number of consecutive failures
    pub fn discovery_backoff(&self, failures: u32) -> Duration {
        backoff(
            self.discovery_backoff_initial,
            failures,
            self.discovery_backoff_max,
        )
    }
}

/// `min(initial * 2^(n-1), cap)`. Zero failures means no delay.
pub fn backoff(initial: Duration, n: u32, cap: Duration) -> Duration {
    if n == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
    initial.saturating_mul(factor).min(cap)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_poll_backoff() {
        let options = EngineOptions::default();
        let delays: Vec<u64> = (1..=6).map(|n| options.poll_backoff(n).as_secs()).collect();
        assert_eq!(delays, vec![60, 120, 240, 300, 300, 300]);
    }

    #[test]
    fn test_discovery_backoff() {
        let options = EngineOptions::default();
        let delays: Vec<u64> = (1..=5).map(|n| options.discovery_backoff(n).as_secs()).collect();
        assert_eq!(delays, vec![30, 60, 120, 150, 150]);
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let cap = Duration::from_secs(300);
        assert_eq!(backoff(Duration::from_secs(60), 40, cap), cap);
        assert_eq!(backoff(Duration::from_secs(60), 0, cap), Duration::ZERO);
    }
}
