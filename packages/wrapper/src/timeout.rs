//! Timeout watchdog: the single exception to the non-intrusive rule.
//! Only armed when the caller supplies an explicit `timeout_sec`.

use std::time::Duration;

use tokio::time::sleep;

use crate::process_group::signal_group;

const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Waits `timeout`, then SIGTERMs the process group, waits `grace`, then
/// SIGKILLs. Intended to run concurrently with the child's wait future and
/// be dropped once the child has actually exited.
pub async fn watch(pgid: i32, timeout: Duration, grace: Duration) {
    sleep(timeout).await;
    tracing::warn!(pgid, timeout_secs = timeout.as_secs(), "run exceeded timeout, sending SIGTERM");
    signal_group(pgid, libc::SIGTERM);
    sleep(grace).await;
    tracing::warn!(pgid, "grace period elapsed, sending SIGKILL");
    signal_group(pgid, libc::SIGKILL);
}

pub fn default_grace() -> Duration {
    DEFAULT_GRACE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grace_matches_spec() {
        assert_eq!(default_grace(), Duration::from_secs(10));
    }
}
