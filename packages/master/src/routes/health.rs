//! Unauthenticated liveness and text-exposition metrics endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, crate::error::ApiError> {
    let job_metrics = state.store.get_job_metrics().await?;
    let scheduling = state.scheduler_metrics.snapshot();

    let mut out = String::new();
    out.push_str(&format!("fleet_active_jobs {}\n", job_metrics.active_jobs));
    out.push_str(&format!("fleet_queue_length {}\n", job_metrics.queue_length));
    out.push_str(&format!("fleet_avg_duration_secs {}\n", job_metrics.avg_duration_secs));
    for (state_name, count) in &job_metrics.by_state {
        out.push_str(&format!("fleet_jobs_by_state{{state=\"{state_name}\"}} {count}\n"));
    }
    out.push_str(&format!("fleet_schedule_attempts{{result=\"success\"}} {}\n", scheduling.success));
    out.push_str(&format!("fleet_schedule_attempts{{result=\"no_worker\"}} {}\n", scheduling.no_worker));
    out.push_str(&format!("fleet_schedule_attempts{{result=\"rejected\"}} {}\n", scheduling.rejected));
    out.push_str(&format!("fleet_schedule_attempts{{result=\"race_lost\"}} {}\n", scheduling.race_lost));
    Ok(out)
}
