//! Health tracker: three states derived from consecutive-failure
//! counters, each reset by the corresponding successful operation.

use chrono::{DateTime, Utc};

use crate::config::WatchdogConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug)]
pub struct HealthTracker {
    consecutive_scan_failures: u32,
    consecutive_attach_failures: u32,
    last_successful_scan: DateTime<Utc>,
}

impl HealthTracker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            consecutive_scan_failures: 0,
            consecutive_attach_failures: 0,
            last_successful_scan: now,
        }
    }

    pub fn record_scan_success(&mut self, now: DateTime<Utc>) {
        self.consecutive_scan_failures = 0;
        self.last_successful_scan = now;
    }

    pub fn record_scan_failure(&mut self) {
        self.consecutive_scan_failures += 1;
    }

    pub fn record_attach_success(&mut self) {
        self.consecutive_attach_failures = 0;
    }

    pub fn record_attach_failure(&mut self) {
        self.consecutive_attach_failures += 1;
    }

    pub fn state(&self, config: &WatchdogConfig, now: DateTime<Utc>) -> HealthState {
        let silence = now - self.last_successful_scan;
        if self.consecutive_scan_failures >= config.unhealthy_scan_failures
            || silence > chrono::Duration::from_std(config.unhealthy_scan_silence).unwrap_or_default()
        {
            return HealthState::Unhealthy;
        }
        if self.consecutive_scan_failures >= config.degraded_scan_failures
            || self.consecutive_attach_failures >= config.degraded_attach_failures
        {
            return HealthState::Degraded;
        }
        HealthState::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrades_after_enough_attach_failures() {
        let config = WatchdogConfig::default();
        let now = Utc::now();
        let mut tracker = HealthTracker::new(now);
        for _ in 0..config.degraded_attach_failures {
            tracker.record_attach_failure();
        }
        assert_eq!(tracker.state(&config, now), HealthState::Degraded);
    }

    #[test]
    fn becomes_unhealthy_after_long_scan_silence() {
        let config = WatchdogConfig::default();
        let started = Utc::now() - chrono::Duration::minutes(5);
        let tracker = HealthTracker::new(started);
        assert_eq!(tracker.state(&config, Utc::now()), HealthState::Unhealthy);
    }

    #[test]
    fn a_success_resets_the_failure_counters() {
        let config = WatchdogConfig::default();
        let now = Utc::now();
        let mut tracker = HealthTracker::new(now);
        tracker.record_scan_failure();
        tracker.record_scan_failure();
        tracker.record_scan_success(now);
        assert_eq!(tracker.state(&config, now), HealthState::Healthy);
    }
}
