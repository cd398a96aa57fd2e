//! Scheduling attempt counters.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Success,
    NoWorker,
    Rejected,
    RaceLost,
}

#[derive(Debug, Default)]
pub struct SchedulingMetrics {
    success: AtomicU64,
    no_worker: AtomicU64,
    rejected: AtomicU64,
    race_lost: AtomicU64,
}

impl SchedulingMetrics {
    pub fn record(&self, outcome: AssignmentOutcome) {
        let counter = match outcome {
            AssignmentOutcome::Success => &self.success,
            AssignmentOutcome::NoWorker => &self.no_worker,
            AssignmentOutcome::Rejected => &self.rejected,
            AssignmentOutcome::RaceLost => &self.race_lost,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulingMetricsSnapshot {
        SchedulingMetricsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            no_worker: self.no_worker.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            race_lost: self.race_lost.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulingMetricsSnapshot {
    pub success: u64,
    pub no_worker: u64,
    pub rejected: u64,
    pub race_lost: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let metrics = SchedulingMetrics::default();
        metrics.record(AssignmentOutcome::Success);
        metrics.record(AssignmentOutcome::Rejected);
        metrics.record(AssignmentOutcome::Rejected);
        let snap = metrics.snapshot();
        assert_eq!(snap.success, 1);
        assert_eq!(snap.rejected, 2);
        assert_eq!(snap.no_worker, 0);
    }
}
