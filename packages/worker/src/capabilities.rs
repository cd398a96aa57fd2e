//! Local hardware detection, run once at startup.

use std::collections::BTreeSet;

use sysinfo::System;

#[derive(Debug, Clone)]
pub struct DetectedCapabilities {
    pub cpu_threads: u32,
    pub cpu_model: String,
    pub ram_total_bytes: u64,
    pub has_gpu: bool,
    pub gpu_type: Option<String>,
    pub gpu_capabilities: BTreeSet<String>,
}

pub fn detect() -> DetectedCapabilities {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu_threads = sys.cpus().len() as u32;
    let cpu_model = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let ram_total_bytes = sys.total_memory();

    let (has_gpu, gpu_type, gpu_capabilities) = detect_gpu();

    DetectedCapabilities {
        cpu_threads,
        cpu_model,
        ram_total_bytes,
        has_gpu,
        gpu_type,
        gpu_capabilities,
    }
}

/// Best-effort NVIDIA GPU probe via `nvidia-smi`. Absence of the binary, or
/// any failure invoking it, is treated as "no GPU" rather than an error —
/// capability detection degrades quietly.
fn detect_gpu() -> (bool, Option<String>, BTreeSet<String>) {
    let output = std::process::Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output();

    let Ok(output) = output else {
        return (false, None, BTreeSet::new());
    };
    if !output.status.success() {
        return (false, None, BTreeSet::new());
    }

    let name = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|s| !s.is_empty());

    match name {
        Some(gpu_type) => {
            let mut caps = BTreeSet::new();
            caps.insert("gpu_h264".to_string());
            caps.insert("gpu_h265".to_string());
            caps.insert("gpu_hevc".to_string());
            (true, Some(gpu_type), caps)
        }
        None => (false, None, BTreeSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_reports_at_least_one_cpu_thread() {
        let caps = detect();
        assert!(caps.cpu_threads >= 1);
    }
}
