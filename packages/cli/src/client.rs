//! Thin HTTP client for the master API, same authenticate-every-request,
//! map-non-2xx-to-an-error shape as the worker's `MasterClient`.

use anyhow::{anyhow, Result};
use fleet_proto::wire::{CompleteJobRequest, JobMetrics, SubmitJobRequest, SubmitJobResponse};
use fleet_proto::{FailureReason, Job, JobStatus, Node};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

pub struct MasterClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MasterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<Option<T>> {
        let response = request.bearer_auth(&self.api_key).send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("master returned {status}: {body}"));
        }

        Ok(Some(response.json::<T>().await?))
    }

    pub async fn submit_job(&self, req: &SubmitJobRequest) -> Result<SubmitJobResponse> {
        let url = format!("{}/jobs", self.base_url);
        self.send(self.http.post(url).json(req)).await?.ok_or_else(|| anyhow!("empty submit response"))
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = format!("{}/jobs", self.base_url);
        self.send(self.http.get(url)).await?.ok_or_else(|| anyhow!("empty jobs list"))
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{id}", self.base_url);
        self.send(self.http.get(url)).await?.ok_or_else(|| anyhow!("job not found"))
    }

    pub async fn cancel_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{id}/cancel", self.base_url);
        self.send(self.http.post(url)).await?.ok_or_else(|| anyhow!("empty cancel response"))
    }

    pub async fn pause_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{id}/pause", self.base_url);
        self.send(self.http.post(url)).await?.ok_or_else(|| anyhow!("empty pause response"))
    }

    pub async fn resume_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{id}/resume", self.base_url);
        self.send(self.http.post(url)).await?.ok_or_else(|| anyhow!("empty resume response"))
    }

    #[allow(dead_code)]
    pub async fn complete_job(
        &self,
        id: Uuid,
        status: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job> {
        let url = format!("{}/jobs/{id}/complete", self.base_url);
        let body = CompleteJobRequest { status, error, failure_reason };
        self.send(self.http.post(url).json(&body)).await?.ok_or_else(|| anyhow!("empty complete response"))
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let url = format!("{}/nodes", self.base_url);
        self.send(self.http.get(url)).await?.ok_or_else(|| anyhow!("empty nodes list"))
    }

    pub async fn get_node(&self, id: Uuid) -> Result<Node> {
        let url = format!("{}/nodes/{id}", self.base_url);
        self.send(self.http.get(url)).await?.ok_or_else(|| anyhow!("node not found"))
    }

    pub async fn metrics(&self) -> Result<JobMetrics> {
        // /metrics is a Prometheus text exposition endpoint (unauthenticated,
        // no JSON body to parse), so status is read straight from job listing.
        let jobs = self.list_jobs().await?;
        let mut metrics = JobMetrics::default();
        for job in &jobs {
            *metrics.by_state.entry(job.status.as_str().to_string()).or_default() += 1;
            *metrics.by_queue.entry(job.queue.as_str().to_string()).or_default() += 1;
            *metrics.by_priority.entry(job.priority.as_str().to_string()).or_default() += 1;
            *metrics.by_engine.entry(job.engine.as_str().to_string()).or_default() += 1;
            if job.status.is_active() {
                metrics.active_jobs += 1;
            }
            if job.status.is_assignable() {
                metrics.queue_length += 1;
            }
        }
        Ok(metrics)
    }
}
