//! Retry queue for failed Attach attempts: per-PID attempt count,
//! last/next attempt timestamps, last error. Exhausted entries drop to a
//! dead-letter list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::classify::ErrorClass;
use crate::config::WatchdogConfig;

#[derive(Debug, Clone)]
pub struct RetryEntry {
    pub pid: i32,
    pub command: String,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
    pub next_attempt: DateTime<Utc>,
    pub last_error: String,
}

#[derive(Debug, Default)]
pub struct RetryQueue {
    entries: HashMap<i32, RetryEntry>,
    pub dead_letter: Vec<RetryEntry>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a failed attach attempt if its error class is retryable.
    /// Ignored otherwise (permanent errors never enter the queue).
    pub fn enqueue(&mut self, config: &WatchdogConfig, pid: i32, command: String, error: &str, now: DateTime<Utc>) {
        if !ErrorClass::classify(error).is_retryable() {
            return;
        }
        let entry = self.entries.entry(pid).or_insert_with(|| RetryEntry {
            pid,
            command,
            attempts: 0,
            last_attempt: now,
            next_attempt: now,
            last_error: error.to_string(),
        });
        entry.attempts += 1;
        entry.last_attempt = now;
        entry.last_error = error.to_string();
        entry.next_attempt = now + backoff_for(config, entry.attempts);
    }

    pub fn remove(&mut self, pid: i32) {
        self.entries.remove(&pid);
    }

    /// Pops every entry whose `next_attempt` has elapsed and whose attempt
    /// count is still under the limit. Entries at the limit move to
    /// `dead_letter` instead of being returned.
    pub fn due(&mut self, config: &WatchdogConfig, now: DateTime<Utc>) -> Vec<RetryEntry> {
        let due_pids: Vec<i32> = self
            .entries
            .values()
            .filter(|e| e.next_attempt <= now)
            .map(|e| e.pid)
            .collect();

        let mut due = Vec::new();
        for pid in due_pids {
            let entry = self.entries.remove(&pid).expect("pid collected from entries");
            if entry.attempts >= config.max_attempts {
                self.dead_letter.push(entry);
            } else {
                due.push(entry);
            }
        }
        due
    }
}

fn backoff_for(config: &WatchdogConfig, attempts: u32) -> chrono::Duration {
    let exp = config.backoff_multiplier.powi(attempts as i32 - 1);
    let secs = (config.initial_backoff.as_secs_f64() * exp).min(config.max_backoff.as_secs_f64());
    chrono::Duration::milliseconds((secs * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors_never_enter_the_queue() {
        let config = WatchdogConfig::default();
        let mut queue = RetryQueue::new();
        queue.enqueue(&config, 123, "ffmpeg".into(), "invalid configuration: schema mismatch", Utc::now());
        assert!(queue.due(&config, Utc::now() + chrono::Duration::hours(1)).is_empty());
    }

    #[test]
    fn exhausted_entries_move_to_dead_letter() {
        let mut config = WatchdogConfig::default();
        config.max_attempts = 2;
        config.initial_backoff = std::time::Duration::from_millis(1);

        let mut queue = RetryQueue::new();
        let now = Utc::now();
        queue.enqueue(&config, 1, "ffmpeg".into(), "does not exist", now);
        queue.enqueue(&config, 1, "ffmpeg".into(), "does not exist", now + chrono::Duration::seconds(1));

        let due = queue.due(&config, now + chrono::Duration::hours(1));
        assert!(due.is_empty());
        assert_eq!(queue.dead_letter.len(), 1);
    }
}
