//! Tunables for the scheduler's background loops.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Assignment loop tick interval. Default 5s.
    pub assignment_tick: Duration,
    /// Orphan recovery loop tick interval. Default >= assignment_tick.
    pub health_tick: Duration,
    /// Retry release loop tick interval.
    pub retry_tick: Duration,
    /// Cleanup loop tick interval. Default 24h.
    pub cleanup_tick: Duration,

    /// A node is offline once `now - last_heartbeat > node_timeout`.
    pub node_timeout: chrono::Duration,

    /// Exponential backoff applied to `retrying` jobs before release to `queued`.
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,

    /// Terminal jobs older than this are eligible for deletion.
    pub retention_window: chrono::Duration,
    /// Cleanup batch size per cleanup tick.
    pub cleanup_batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            assignment_tick: Duration::from_secs(5),
            health_tick: Duration::from_secs(5),
            retry_tick: Duration::from_secs(1),
            cleanup_tick: Duration::from_secs(24 * 60 * 60),
            node_timeout: chrono::Duration::seconds(30),
            initial_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(5 * 60),
            retention_window: chrono::Duration::days(7),
            cleanup_batch_size: 100,
        }
    }
}

impl SchedulerConfig {
    /// `node_timeout` defaults to 2x the heartbeat period, floored at 30s.
    pub fn with_heartbeat_period(mut self, heartbeat_period: Duration) -> Self {
        let derived = chrono::Duration::from_std(heartbeat_period * 2).unwrap_or(self.node_timeout);
        self.node_timeout = derived.max(chrono::Duration::seconds(30));
        self
    }
}

/// `min(initial * multiplier^retry_count, max)`, jittered uniformly by ±20%.
pub fn backoff_for(config: &SchedulerConfig, retry_count: i32) -> Duration {
    let base = config.initial_backoff.as_secs_f64() * config.backoff_multiplier.powi(retry_count.max(0));
    let capped = base.min(config.max_backoff.as_secs_f64());
    let jitter = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered = (capped * (1.0 + jitter)).max(0.0);
    Duration::from_secs_f64(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let config = SchedulerConfig::default();
        let d0 = backoff_for(&config, 0).as_secs_f64();
        let d3 = backoff_for(&config, 3).as_secs_f64();
        let d_large = backoff_for(&config, 20).as_secs_f64();
        assert!(d0 <= 6.0 && d0 >= 4.0);
        assert!(d3 > d0);
        assert!(d_large <= config.max_backoff.as_secs_f64() * 1.2 + 0.01);
    }
}
