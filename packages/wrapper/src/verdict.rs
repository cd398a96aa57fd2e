//! The platform-SLA verdict: distinguishes "the governance platform
//! did its job" from "the workload succeeded". A workload that fails on bad
//! input is still a compliant platform outcome.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSla {
    Compliant,
    NonCompliant,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub platform_sla: PlatformSla,
    pub reason: String,
}

/// Derives the platform-SLA verdict for a completed Run. The platform is
/// non-compliant when it failed to even launch or observe the child;
/// whatever exit code the workload itself produced is not the platform's
/// failure to report.
pub fn derive_verdict(
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    exit_code: Option<i32>,
    limits_applied: bool,
) -> RunOutcome {
    let (platform_sla, reason) = match exit_code {
        Some(_) if limits_applied => (PlatformSla::Compliant, "observed to completion".to_string()),
        Some(_) => (
            PlatformSla::Compliant,
            "observed to completion; resource limits could not be applied".to_string(),
        ),
        None => (
            PlatformSla::NonCompliant,
            "child exit status unavailable".to_string(),
        ),
    };
    RunOutcome { started_at, ended_at, exit_code, platform_sla, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_exit_code_is_non_compliant() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let outcome = derive_verdict(now, now, None, true);
        assert_eq!(outcome.platform_sla, PlatformSla::NonCompliant);
    }

    #[test]
    fn observed_exit_is_compliant_regardless_of_workload_result() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let outcome = derive_verdict(now, now, Some(1), true);
        assert_eq!(outcome.platform_sla, PlatformSla::Compliant);
    }
}
