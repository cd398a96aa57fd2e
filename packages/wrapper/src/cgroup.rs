//! Kernel resource-control hierarchy: writes limit fields to the
//! well-known cgroup v2 control files, falling back to v1 when v2 is
//! unavailable. Every operation here is best effort — absence of privileged
//! access degrades gracefully rather than failing the run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::limits::ResourceLimits;

const V2_ROOT: &str = "/sys/fs/cgroup";
const V1_CPU_ROOT: &str = "/sys/fs/cgroup/cpu";
const V1_MEMORY_ROOT: &str = "/sys/fs/cgroup/memory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V2,
    V1,
}

fn detect_version() -> Option<Version> {
    if Path::new(V2_ROOT).join("cgroup.controllers").exists() {
        Some(Version::V2)
    } else if Path::new(V1_CPU_ROOT).exists() && Path::new(V1_MEMORY_ROOT).exists() {
        Some(Version::V1)
    } else {
        None
    }
}

/// A control group created for one wrapper invocation, named after the
/// caller-supplied identifier (job-id-derived, so creation is idempotent
/// by name).
pub struct Cgroup {
    version: Version,
    name: String,
}

impl Cgroup {
    /// Creates (idempotently) the control group directories for `name`.
    /// Returns `None` if no cgroup hierarchy is available (unprivileged
    /// environment); callers degrade to nice-based deprioritization only.
    pub fn create(name: &str) -> Option<Self> {
        let version = detect_version()?;
        match version {
            Version::V2 => {
                let dir = PathBuf::from(V2_ROOT).join("fleet").join(name);
                if fs::create_dir_all(&dir).is_err() {
                    return None;
                }
            }
            Version::V1 => {
                for root in [V1_CPU_ROOT, V1_MEMORY_ROOT] {
                    let dir = PathBuf::from(root).join("fleet").join(name);
                    if fs::create_dir_all(&dir).is_err() {
                        return None;
                    }
                }
            }
        }
        Some(Self { version, name: name.to_string() })
    }

    fn v2_dir(&self) -> PathBuf {
        PathBuf::from(V2_ROOT).join("fleet").join(&self.name)
    }

    fn v1_dir(&self, controller_root: &str) -> PathBuf {
        PathBuf::from(controller_root).join("fleet").join(&self.name)
    }

    fn write_best_effort(path: &Path, value: &str) {
        if let Err(err) = fs::write(path, value) {
            tracing::warn!(path = %path.display(), error = %err, "failed to write cgroup control file");
        }
    }

    /// Applies every present limit field. Unsupported fields on v1 (unified
    /// IO max) are silently skipped.
    pub fn apply_limits(&self, limits: &ResourceLimits) {
        match self.version {
            Version::V2 => {
                let dir = self.v2_dir();
                if let Some((quota, period)) = limits.cpu_quota {
                    let value = if quota < 0 {
                        format!("max {period}")
                    } else {
                        format!("{quota} {period}")
                    };
                    Self::write_best_effort(&dir.join("cpu.max"), &value);
                }
                if let Some(weight) = limits.cpu_weight {
                    Self::write_best_effort(&dir.join("cpu.weight"), &weight.to_string());
                }
                if let Some(max) = limits.memory_max {
                    Self::write_best_effort(&dir.join("memory.max"), &max.to_string());
                }
                if limits.io_rbps.is_some() || limits.io_wbps.is_some() {
                    tracing::debug!("io.max requires a device major:minor; skipped without device context");
                }
            }
            Version::V1 => {
                let cpu_dir = self.v1_dir(V1_CPU_ROOT);
                let mem_dir = self.v1_dir(V1_MEMORY_ROOT);
                if let Some((quota, period)) = limits.cpu_quota {
                    Self::write_best_effort(&cpu_dir.join("cpu.cfs_quota_us"), &quota.to_string());
                    Self::write_best_effort(&cpu_dir.join("cpu.cfs_period_us"), &period.to_string());
                }
                if let Some(weight) = limits.cpu_weight {
                    // v1 shares have a different scale than v2 weight; pass through as-is.
                    Self::write_best_effort(&cpu_dir.join("cpu.shares"), &weight.to_string());
                }
                if let Some(max) = limits.memory_max {
                    Self::write_best_effort(&mem_dir.join("memory.limit_in_bytes"), &max.to_string());
                }
                if limits.io_rbps.is_some() || limits.io_wbps.is_some() {
                    tracing::debug!("unified io limits are a v2-only control, skipped on v1");
                }
            }
        }
    }

    /// Enrolls `pid` by writing it to `cgroup.procs`.
    pub fn enroll(&self, pid: i32) {
        let paths: Vec<PathBuf> = match self.version {
            Version::V2 => vec![self.v2_dir().join("cgroup.procs")],
            Version::V1 => vec![
                self.v1_dir(V1_CPU_ROOT).join("cgroup.procs"),
                self.v1_dir(V1_MEMORY_ROOT).join("cgroup.procs"),
            ],
        };
        for path in paths {
            Self::write_best_effort(&path, &pid.to_string());
        }
    }

    /// Removes the control group. Best effort, swallowed on failure.
    pub fn remove(&self) {
        let dirs: Vec<PathBuf> = match self.version {
            Version::V2 => vec![self.v2_dir()],
            Version::V1 => vec![self.v1_dir(V1_CPU_ROOT), self.v1_dir(V1_MEMORY_ROOT)],
        };
        for dir in dirs {
            let _ = fs::remove_dir(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hierarchy_yields_no_cgroup() {
        // CI/sandboxes without a real cgroupfs mount should degrade gracefully.
        if !Path::new(V2_ROOT).exists() {
            assert!(Cgroup::create("test-job").is_none());
        }
    }
}
