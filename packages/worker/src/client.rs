//! HTTP client for the master API, grounded on the same
//! authenticate-every-request, map-non-2xx-to-an-error-variant shape used by
//! this codebase's other external API clients.

use fleet_proto::wire::{
    CompleteJobRequest, HeartbeatResponse, ProgressUpdateRequest, RegisterNodeRequest, RegisterNodeResponse,
};
use fleet_proto::{FailureReason, Job, JobStatus};
use reqwest::{Client, StatusCode};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, WorkerError};

#[derive(Clone)]
pub struct MasterClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MasterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "master request failed");
                WorkerError::Transport(e)
            })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::Api { status: status.as_u16(), body });
        }

        let parsed = response.json::<T>().await.map_err(WorkerError::Transport)?;
        Ok(Some(parsed))
    }

    pub async fn register_node(&self, req: &RegisterNodeRequest) -> Result<RegisterNodeResponse> {
        let url = format!("{}/nodes/register", self.base_url);
        self.send(self.http.post(url).json(req))
            .await?
            .ok_or_else(|| WorkerError::Api { status: 0, body: "empty register response".into() })
    }

    pub async fn heartbeat(&self, node_id: Uuid) -> Result<HeartbeatResponse> {
        let url = format!("{}/nodes/{node_id}/heartbeat", self.base_url);
        self.send(self.http.post(url))
            .await?
            .ok_or_else(|| WorkerError::Api { status: 0, body: "empty heartbeat response".into() })
    }

    /// Returns `None` on 204 (no job assigned).
    pub async fn poll(&self, node_id: Uuid) -> Result<Option<Job>> {
        let url = format!("{}/nodes/{node_id}/poll", self.base_url);
        self.send(self.http.post(url)).await
    }

    pub async fn report_progress(&self, job_id: Uuid, progress: i32) -> Result<()> {
        let url = format!("{}/jobs/{job_id}/progress", self.base_url);
        let body = ProgressUpdateRequest { progress };
        self.send::<serde_json::Value>(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    pub async fn report_completion(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job> {
        let url = format!("{}/jobs/{job_id}/complete", self.base_url);
        let body = CompleteJobRequest { status, error, failure_reason };
        self.send(self.http.post(url).json(&body))
            .await?
            .ok_or_else(|| WorkerError::Api { status: 0, body: "empty complete response".into() })
    }
}
