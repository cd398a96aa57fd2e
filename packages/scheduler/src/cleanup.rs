//! Cleanup loop: deletes terminal jobs past the retention window,
//! batched and throttled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_proto::JobStatus;
use fleet_store::Store;

use crate::config::SchedulerConfig;

const TERMINAL_STATES: &[JobStatus] = &[
    JobStatus::Completed,
    JobStatus::Failed,
    JobStatus::Canceled,
    JobStatus::Rejected,
];

pub async fn run_tick(store: &Arc<dyn Store>, config: &SchedulerConfig) -> fleet_store::Result<()> {
    let now = Utc::now();
    let mut deleted = 0usize;

    for &state in TERMINAL_STATES {
        let jobs = store.get_jobs_in_state(state).await?;
        for job in jobs {
            let completed_at = match job.completed_at {
                Some(t) => t,
                None => continue,
            };
            if now - completed_at < config.retention_window {
                continue;
            }

            store.delete_job(job.id).await?;
            deleted += 1;
            tracing::debug!(job_id = %job.id, "deleted job past retention window");

            if deleted % config.cleanup_batch_size == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }

    if deleted > 0 {
        tracing::info!(deleted, "cleanup loop removed expired terminal jobs");
    }
    Ok(())
}
