//! `Attach`: passive governance over a PID the wrapper does not own.
//! Never signals the target; the only state change it makes is enrolling the
//! PID into a resource-limit group.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cgroup::Cgroup;
use crate::error::{Result, WrapperError};
use crate::limits::ResourceLimits;
use crate::process_group::pid_exists;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct AttachRequest {
    pub pid: i32,
    pub name: String,
    pub limits: ResourceLimits,
}

/// Returns once the PID exits or `cancel` fires — it never signals the PID
/// either way; canceling only stops observing it.
pub async fn attach(request: AttachRequest, cancel: CancellationToken) -> Result<()> {
    if !pid_exists(request.pid) {
        return Err(WrapperError::NoSuchProcess(request.pid));
    }

    if !request.limits.is_empty() {
        if let Some(cgroup) = Cgroup::create(&request.name) {
            cgroup.enroll(request.pid);
            cgroup.apply_limits(&request.limits);
        }
    }

    loop {
        if !pid_exists(request.pid) {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attach_fails_fast_on_nonexistent_pid() {
        let request = AttachRequest {
            pid: i32::MAX - 1,
            name: "test-attach-missing".to_string(),
            limits: ResourceLimits::default(),
        };
        let err = attach(request, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, WrapperError::NoSuchProcess(_)));
    }

    #[tokio::test]
    async fn attach_observes_until_process_exits_without_signaling_it() {
        let mut child = tokio::process::Command::new("/bin/sleep")
            .arg("1")
            .spawn()
            .expect("spawn sleep");
        let pid = child.id().expect("has pid") as i32;

        let request = AttachRequest {
            pid,
            name: "test-attach-observe".to_string(),
            limits: ResourceLimits::default(),
        };
        attach(request, CancellationToken::new()).await.expect("attach should observe to exit");
        let status = child.wait().await.expect("child already exited");
        assert!(status.success());
    }

    #[tokio::test]
    async fn attach_stops_observing_on_cancellation_without_signaling() {
        let mut child = tokio::process::Command::new("/bin/sleep")
            .arg("5")
            .spawn()
            .expect("spawn sleep");
        let pid = child.id().expect("has pid") as i32;

        let request = AttachRequest {
            pid,
            name: "test-attach-cancel".to_string(),
            limits: ResourceLimits::default(),
        };
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });
        attach(request, cancel).await.expect("attach should return on cancellation");
        assert!(pid_exists(pid), "attach must never signal the observed pid");
        child.kill().await.ok();
    }
}
