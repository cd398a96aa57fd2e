use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub scan_interval: Duration,
    pub retry_tick: Duration,
    pub flush_interval: Duration,
    /// A process younger than this is not yet a stable discovery.
    pub min_age: Duration,
    pub target_commands: Vec<String>,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    pub state_path: PathBuf,
    pub degraded_scan_failures: u32,
    pub degraded_attach_failures: u32,
    pub unhealthy_scan_failures: u32,
    pub unhealthy_scan_silence: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(10),
            retry_tick: Duration::from_secs(5),
            flush_interval: Duration::from_secs(30),
            min_age: Duration::from_secs(1),
            target_commands: vec!["ffmpeg".to_string(), "gst-launch-1.0".to_string()],
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(5 * 60),
            state_path: PathBuf::from("watchdog-state.json"),
            degraded_scan_failures: 3,
            degraded_attach_failures: 10,
            unhealthy_scan_failures: 5,
            unhealthy_scan_silence: Duration::from_secs(2 * 60),
        }
    }
}

impl WatchdogConfig {
    /// Loads defaults, overriding the state path and scan interval from the
    /// environment if present. The rest of the tuning knobs (backoff,
    /// thresholds) are expected to stay at their spec defaults in practice.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("WATCHDOG_STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }
        if let Ok(secs) = std::env::var("WATCHDOG_SCAN_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.scan_interval = Duration::from_secs(secs);
            }
        }
        config
    }
}
