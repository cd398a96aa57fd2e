//! Execute loop: runs one acquired job to completion behind the governance
//! wrapper and reports progress/terminal outcome back to the master.

use std::time::Duration;

use fleet_proto::{FailureReason, Job, JobStatus};
use fleet_wrapper::limits::ResourceLimits;
use fleet_wrapper::run::{run, RunRequest};
use fleet_wrapper::verdict::PlatformSla;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::MasterClient;

const PROGRESS_TICK: Duration = Duration::from_millis(900);

/// Executes `job` to completion, reporting heuristic progress at ≥1 Hz while
/// it runs (the transcoder's own progress output is outside this system's
/// scope, see the engines crate) and the terminal outcome on exit.
pub async fn execute_job(client: MasterClient, job: Job, master_url: String, cancel: CancellationToken) {
    let engine = fleet_engines::resolve_engine(&job);
    let argv = engine.build_command(&job, &master_url);
    let limits = resource_limits_from_job(&job);

    let request = RunRequest {
        argv,
        working_dir: std::env::temp_dir(),
        name: job.id.to_string(),
        limits,
        timeout_sec: None,
    };

    let progress_handle = {
        let client = client.clone();
        let job_id = job.id;
        let cancel = cancel.clone();
        tokio::spawn(async move { run_progress_ticker(client, job_id, cancel).await })
    };

    let outcome = run(request, cancel).await;
    progress_handle.abort();

    match outcome {
        Ok(result) if result.platform_sla == PlatformSla::Compliant => {
            report_terminal_outcome(&client, job.id, result.exit_code).await;
        }
        Ok(result) => {
            warn!(job_id = %job.id, reason = %result.reason, "wrapper did not observe the run to completion");
            report_failure(&client, job.id, &result.reason, FailureReason::PlatformError).await;
        }
        Err(err) => {
            warn!(job_id = %job.id, error = %err, "failed to run job");
            let message = err.to_string();
            let reason = FailureReason::classify(&message);
            report_failure(&client, job.id, &message, reason).await;
        }
    }
}

fn resource_limits_from_job(job: &Job) -> ResourceLimits {
    if !job.wrapper_enabled {
        return ResourceLimits::default();
    }
    let Some(constraints) = &job.wrapper_constraints else {
        return ResourceLimits::default();
    };
    ResourceLimits {
        cpu_quota: constraints
            .get("cpu_quota_us")
            .and_then(|v| v.as_i64())
            .map(|quota| (quota, 100_000)),
        cpu_weight: constraints.get("cpu_weight").and_then(|v| v.as_u64()),
        memory_max: constraints.get("memory_max_bytes").and_then(|v| v.as_u64()),
        io_rbps: constraints.get("io_rbps").and_then(|v| v.as_u64()),
        io_wbps: constraints.get("io_wbps").and_then(|v| v.as_u64()),
    }
}

async fn run_progress_ticker(client: MasterClient, job_id: uuid::Uuid, cancel: CancellationToken) {
    let mut progress = 0;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(PROGRESS_TICK) => {
                if progress < 90 {
                    progress += 5;
                }
                if let Err(err) = client.report_progress(job_id, progress).await {
                    warn!(job_id = %job_id, error = %err, "failed to report progress");
                }
            }
            _ = cancel.cancelled() => return,
        }
    }
}

async fn report_terminal_outcome(client: &MasterClient, job_id: uuid::Uuid, exit_code: Option<i32>) {
    let (status, error, reason) = match exit_code {
        Some(0) => (JobStatus::Completed, None, None),
        Some(code) => (
            JobStatus::Failed,
            Some(format!("workload exited with status {code}")),
            Some(FailureReason::RuntimeError),
        ),
        None => (
            JobStatus::Failed,
            Some("workload terminated by signal".to_string()),
            Some(FailureReason::WorkerDied),
        ),
    };

    match client.report_completion(job_id, status, error, reason).await {
        Ok(_) => info!(job_id = %job_id, %status, "reported job completion"),
        Err(err) => warn!(job_id = %job_id, error = %err, "failed to report job completion"),
    }
}

async fn report_failure(client: &MasterClient, job_id: uuid::Uuid, message: &str, reason: FailureReason) {
    if let Err(err) = client
        .report_completion(job_id, JobStatus::Failed, Some(message.to_string()), Some(reason))
        .await
    {
        warn!(job_id = %job_id, error = %err, "failed to report job failure");
    }
}
