//! Resource limit specification applied via [`crate::cgroup`].

#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    /// CPU quota as `(quota_us, period_us)`, written to `cpu.max` (v2) or
    /// `cpu.cfs_quota_us`/`cpu.cfs_period_us` (v1).
    pub cpu_quota: Option<(i64, u64)>,
    /// Relative CPU weight, `cpu.weight` (v2) or `cpu.shares` (v1).
    pub cpu_weight: Option<u64>,
    /// Hard memory ceiling in bytes, `memory.max` (v2) or `memory.limit_in_bytes` (v1).
    pub memory_max: Option<u64>,
    /// Read bytes/sec cap. Unified `io.max` only exists on v2; silently
    /// skipped on v1.
    pub io_rbps: Option<u64>,
    /// Write bytes/sec cap, same v1 caveat as `io_rbps`.
    pub io_wbps: Option<u64>,
}

impl ResourceLimits {
    pub fn is_empty(&self) -> bool {
        self.cpu_quota.is_none()
            && self.cpu_weight.is_none()
            && self.memory_max.is_none()
            && self.io_rbps.is_none()
            && self.io_wbps.is_none()
    }
}
