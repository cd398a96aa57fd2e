//! Spawns child processes into their own session/process group so the
//! wrapper can signal the whole tree without taking the controlling
//! terminal or its own process group down with it. The wrapper's own
//! death must not take the workload with it, and vice versa.

use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use crate::error::{Result, WrapperError};

/// Spawns `argv[0]` with `argv[1..]` as arguments in a freshly created
/// session, inheriting stdout/stderr so caller-side log capture keeps
/// working.
pub fn spawn_detached(argv: &[String]) -> Result<tokio::process::Child> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        WrapperError::Spawn(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"))
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    unsafe {
        command.pre_exec(|| {
            // setsid() detaches from the parent's process group and controlling
            // terminal; the new pgid equals the child's own pid.
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut tokio_command = tokio::process::Command::from(command);
    tokio_command.kill_on_drop(false);
    tokio_command.spawn().map_err(WrapperError::Spawn)
}

/// Sends `signal` to every process in `pgid`'s process group.
pub fn signal_group(pgid: i32, signal: i32) {
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(pgid, signal, error = %err, "failed to signal process group");
        }
    }
}

/// Probes whether `pid` is alive via a signal-0 delivery, per `kill(2)`.
/// Never perturbs the target process.
pub fn pid_exists(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_detached_runs_and_exits() {
        let mut child = spawn_detached(&["/bin/true".to_string()]).expect("spawn should succeed");
        let status = child.wait().await.expect("wait should succeed");
        assert!(status.success());
    }

    #[test]
    fn pid_exists_is_true_for_self() {
        let pid = std::process::id() as i32;
        assert!(pid_exists(pid));
    }

    #[test]
    fn pid_exists_is_false_for_unlikely_pid() {
        assert!(!pid_exists(i32::MAX - 1));
    }
}
