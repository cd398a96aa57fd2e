//! The `Store` trait and its single cross-backend implementation.

use async_trait::async_trait;
use chrono::Utc;
use fleet_proto::job::{is_allowed_transition, Transition};
use fleet_proto::{FailureReason, Job, JobStatus, Node, NodeStatus};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::schema::{self, fmt_ts, job_from_row, node_from_row, to_json, transition_from_row, DDL};

/// Durable node/job persistence. Every mutating method that moves a
/// job or node between states does so as a single atomic compare-and-set:
/// callers never observe a half-applied transition.
#[async_trait]
pub trait Store: Send + Sync {
    async fn register_node(&self, node: Node) -> Result<Node>;
    async fn get_node(&self, id: Uuid) -> Result<Node>;
    async fn get_all_nodes(&self) -> Result<Vec<Node>>;
    async fn update_node_heartbeat(&self, id: Uuid, status: NodeStatus) -> Result<()>;
    async fn update_node_status(&self, id: Uuid, status: NodeStatus) -> Result<()>;

    async fn create_job(&self, job: Job) -> Result<Job>;
    async fn get_job(&self, id: Uuid) -> Result<Job>;
    async fn get_job_by_sequence_number(&self, sequence_number: i64) -> Result<Job>;
    async fn get_all_jobs(&self) -> Result<Vec<Job>>;
    async fn get_jobs_in_state(&self, status: JobStatus) -> Result<Vec<Job>>;
    async fn update_job_progress(&self, job_id: Uuid, progress: i32) -> Result<()>;

    async fn transition_job_state(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
        reason: Option<String>,
    ) -> Result<Job>;

    async fn assign_job_to_worker(&self, job_id: Uuid, node_id: Uuid) -> Result<Job>;

    async fn complete_job(
        &self,
        job_id: Uuid,
        to: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job>;

    /// Terminal compare-and-set from an arbitrary origin state (not just
    /// `running`), for jobs failed or rejected before ever reaching a worker
    /// (scheduler-side rejection, orphan recovery past the retry ceiling).
    /// Unlike `complete_job`, never changes the owning node's `status` — the
    /// node's health is the heartbeat/orphan loop's concern, not the job's.
    async fn fail_job(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job>;

    async fn get_job_metrics(&self) -> Result<fleet_proto::wire::JobMetrics>;
    async fn delete_job(&self, id: Uuid) -> Result<()>;
    async fn vacuum(&self) -> Result<()>;
}

/// `sqlx::Any`-backed implementation. The same SQL runs against an embedded
/// SQLite file (`sqlite://fleet.db`) or a networked PostgreSQL database
/// (`postgres://...`); only the DSN scheme changes.
pub struct AnyStore {
    pool: AnyPool,
}

impl AnyStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(16).connect(dsn).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<()> {
        for statement in DDL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        sqlx::query("INSERT INTO job_sequence (id, value) SELECT 1, 0 WHERE NOT EXISTS (SELECT 1 FROM job_sequence WHERE id = 1)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn next_sequence_number(tx: &mut sqlx::Transaction<'_, sqlx::Any>) -> Result<i64> {
        let row = sqlx::query("UPDATE job_sequence SET value = value + 1 WHERE id = 1 RETURNING value")
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.try_get::<i64, _>("value")?)
    }
}

#[async_trait]
impl Store for AnyStore {
    async fn update_job_progress(&self, job_id: Uuid, progress: i32) -> Result<()> {
        let clamped = Job::clamp_progress(progress);
        let result = sqlx::query("UPDATE jobs SET progress = ? WHERE id = ? AND status = 'running'")
            .bind(clamped)
            .bind(job_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }
        Ok(())
    }

    async fn register_node(&self, node: Node) -> Result<Node> {
        let gpu_caps = to_json(&node.gpu_capabilities)?;
        let labels = to_json(&node.labels)?;
        let now = fmt_ts(Utc::now());
        let row = sqlx::query(
            r#"
            INSERT INTO nodes (
                id, tenant_id, name, address, node_type, cpu_threads, cpu_model,
                has_gpu, gpu_type, gpu_capabilities, ram_total_bytes, labels,
                status, last_heartbeat, registered_at, current_job_id
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            ON CONFLICT(name, address) DO UPDATE SET
                node_type = excluded.node_type,
                cpu_threads = excluded.cpu_threads,
                cpu_model = excluded.cpu_model,
                has_gpu = excluded.has_gpu,
                gpu_type = excluded.gpu_type,
                gpu_capabilities = excluded.gpu_capabilities,
                ram_total_bytes = excluded.ram_total_bytes,
                labels = excluded.labels,
                status = excluded.status,
                last_heartbeat = excluded.last_heartbeat
            RETURNING *
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.tenant_id.to_string())
        .bind(node.name.clone())
        .bind(node.address.clone())
        .bind(node.node_type.as_str())
        .bind(node.cpu_threads as i64)
        .bind(node.cpu_model.clone())
        .bind(node.has_gpu as i64)
        .bind(node.gpu_type.clone())
        .bind(gpu_caps)
        .bind(node.ram_total_bytes as i64)
        .bind(labels)
        .bind(node.status.as_str())
        .bind(now.clone())
        .bind(now)
        .bind(node.current_job_id.map(|id| id.to_string()))
        .fetch_one(&self.pool)
        .await?;
        node_from_row(&row)
    }

    async fn get_node(&self, id: Uuid) -> Result<Node> {
        let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NodeNotFound(id))?;
        node_from_row(&row)
    }

    async fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let rows = sqlx::query("SELECT * FROM nodes ORDER BY registered_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(node_from_row).collect()
    }

    async fn update_node_heartbeat(&self, id: Uuid, status: NodeStatus) -> Result<()> {
        let result = sqlx::query("UPDATE nodes SET last_heartbeat = ?, status = ? WHERE id = ?")
            .bind(fmt_ts(Utc::now()))
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NodeNotFound(id));
        }
        Ok(())
    }

    async fn update_node_status(&self, id: Uuid, status: NodeStatus) -> Result<()> {
        let result = sqlx::query("UPDATE nodes SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NodeNotFound(id));
        }
        Ok(())
    }

    async fn create_job(&self, mut job: Job) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        job.sequence_number = Self::next_sequence_number(&mut tx).await?;

        let params = to_json(&job.parameters)?;
        let caps = to_json(&job.required_capabilities)?;
        let wrapper_constraints = job
            .wrapper_constraints
            .as_ref()
            .map(to_json)
            .transpose()?;

        let row = sqlx::query(
            r#"
            INSERT INTO jobs (
                id, sequence_number, scenario, engine, confidence, queue, priority,
                parameters, required_capabilities, status, node_id, retry_count,
                max_retries, error, failure_reason, progress, created_at, started_at,
                completed_at, wrapper_enabled, wrapper_constraints
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            RETURNING *
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.sequence_number)
        .bind(job.scenario.clone())
        .bind(job.engine.as_str())
        .bind(job.confidence)
        .bind(job.queue.as_str())
        .bind(job.priority.as_str())
        .bind(params)
        .bind(caps)
        .bind(job.status.as_str())
        .bind(job.node_id.map(|id| id.to_string()))
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(job.error.clone())
        .bind(job.failure_reason.map(|f| f.as_str()))
        .bind(job.progress)
        .bind(fmt_ts(job.created_at))
        .bind(job.started_at.map(fmt_ts))
        .bind(job.completed_at.map(fmt_ts))
        .bind(job.wrapper_enabled as i64)
        .bind(wrapper_constraints)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        job_from_row(&row)
    }

    async fn get_job(&self, id: Uuid) -> Result<Job> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        let mut job = job_from_row(&row)?;
        job.state_transitions = self.transitions_for(id).await?;
        Ok(job)
    }

    async fn get_job_by_sequence_number(&self, sequence_number: i64) -> Result<Job> {
        let row = sqlx::query("SELECT * FROM jobs WHERE sequence_number = ?")
            .bind(sequence_number)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(sequence_number.to_string()))?;
        job_from_row(&row)
    }

    async fn get_all_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY sequence_number")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn get_jobs_in_state(&self, status: JobStatus) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = ? ORDER BY priority, queue, sequence_number")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        let mut jobs = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut job = job_from_row(row)?;
            job.state_transitions = self.transitions_for(job.id).await?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    async fn transition_job_state(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
        reason: Option<String>,
    ) -> Result<Job> {
        if !is_allowed_transition(from, to) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "illegal transition {from} -> {to}"
            ))));
        }
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::QueryBuilder::<sqlx::Any>::new("UPDATE jobs SET status = ");
        query.push_bind(to.as_str());
        if to.is_terminal() {
            query.push(", completed_at = ");
            query.push_bind(fmt_ts(Utc::now()));
        }
        if to == JobStatus::Running && from == JobStatus::Assigned {
            query.push(", started_at = ");
            query.push_bind(fmt_ts(Utc::now()));
        }
        if to == JobStatus::Retrying {
            // Orphan recovery and failure handling both land here; the job
            // gives up its worker and counts one more attempt.
            query.push(", retry_count = retry_count + 1, node_id = NULL");
        }
        query.push(" WHERE id = ");
        query.push_bind(job_id.to_string());
        query.push(" AND status = ");
        query.push_bind(from.as_str());

        let result = query.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::JobNotFound(format!(
                "{job_id} not in state {from} (concurrent transition lost the race)"
            )));
        }

        let transition = Transition::new(from, to, reason);
        sqlx::query(
            "INSERT INTO state_transitions (job_id, from_status, to_status, ts, reason) VALUES (?,?,?,?,?)",
        )
        .bind(job_id.to_string())
        .bind(&transition.from)
        .bind(&transition.to)
        .bind(fmt_ts(transition.timestamp))
        .bind(&transition.reason)
        .execute(&mut *tx)
        .await?;

        if to.is_terminal() {
            // A job can land here (e.g. canceled straight out of `retrying`
            // or `timed_out`) while still owning a node; release it, but
            // leave the node's own status alone.
            sqlx::query("UPDATE nodes SET current_job_id = NULL WHERE current_job_id = ?")
                .bind(job_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        job_from_row(&row)
    }

    async fn assign_job_to_worker(&self, job_id: Uuid, node_id: Uuid) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        let node_claim = sqlx::query("UPDATE nodes SET status = 'busy', current_job_id = ? WHERE id = ? AND status = 'available'")
            .bind(job_id.to_string())
            .bind(node_id.to_string())
            .execute(&mut *tx)
            .await?;
        if node_claim.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NodeNotFound(node_id));
        }

        let job_claim = sqlx::query(
            "UPDATE jobs SET status = 'assigned', node_id = ? WHERE id = ? AND status IN ('queued', 'retrying')",
        )
        .bind(node_id.to_string())
        .bind(job_id.to_string())
        .execute(&mut *tx)
        .await?;
        if job_claim.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::JobNotFound(format!(
                "{job_id} was no longer assignable (concurrent assignment lost the race)"
            )));
        }

        let transition = Transition::new(JobStatus::Queued, JobStatus::Assigned, None);
        sqlx::query(
            "INSERT INTO state_transitions (job_id, from_status, to_status, ts, reason) VALUES (?,?,?,?,?)",
        )
        .bind(job_id.to_string())
        .bind(&transition.from)
        .bind(&transition.to)
        .bind(fmt_ts(transition.timestamp))
        .bind(&transition.reason)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        job_from_row(&row)
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        to: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        let job = job_from_row(&existing)?;
        let node_id: Option<String> = existing.try_get("node_id")?;

        let result = sqlx::query(
            "UPDATE jobs SET status = ?, error = ?, failure_reason = ?, completed_at = ? WHERE id = ? AND status = 'running'",
        )
        .bind(to.as_str())
        .bind(&error)
        .bind(failure_reason.map(|f| f.as_str()))
        .bind(fmt_ts(Utc::now()))
        .bind(job_id.to_string())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::JobNotFound(format!(
                "{job_id} was not running (concurrent completion lost the race)"
            )));
        }

        if let Some(node_id) = node_id {
            sqlx::query("UPDATE nodes SET status = 'available', current_job_id = NULL WHERE id = ?")
                .bind(&node_id)
                .execute(&mut *tx)
                .await?;
        }

        let transition = Transition::new(job.status, to, error);
        sqlx::query(
            "INSERT INTO state_transitions (job_id, from_status, to_status, ts, reason) VALUES (?,?,?,?,?)",
        )
        .bind(job_id.to_string())
        .bind(&transition.from)
        .bind(&transition.to)
        .bind(fmt_ts(transition.timestamp))
        .bind(&transition.reason)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        job_from_row(&row)
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
        error: Option<String>,
        failure_reason: Option<FailureReason>,
    ) -> Result<Job> {
        if !is_allowed_transition(from, to) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "illegal transition {from} -> {to}"
            ))));
        }
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT * FROM jobs WHERE id = ? AND status = ?")
            .bind(job_id.to_string())
            .bind(from.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                StoreError::JobNotFound(format!(
                    "{job_id} not in state {from} (concurrent transition lost the race)"
                ))
            })?;
        let node_id: Option<String> = existing.try_get("node_id")?;

        let result = sqlx::query(
            "UPDATE jobs SET status = ?, node_id = NULL, error = ?, failure_reason = ?, completed_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(&error)
        .bind(failure_reason.map(|f| f.as_str()))
        .bind(fmt_ts(Utc::now()))
        .bind(job_id.to_string())
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::JobNotFound(format!(
                "{job_id} not in state {from} (concurrent transition lost the race)"
            )));
        }

        // The node keeps whatever status the heartbeat/orphan loop already
        // gave it (e.g. offline); a job failing never resurrects it.
        if let Some(node_id) = node_id {
            sqlx::query("UPDATE nodes SET current_job_id = NULL WHERE id = ? AND current_job_id = ?")
                .bind(&node_id)
                .bind(job_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        let transition = Transition::new(from, to, error);
        sqlx::query(
            "INSERT INTO state_transitions (job_id, from_status, to_status, ts, reason) VALUES (?,?,?,?,?)",
        )
        .bind(job_id.to_string())
        .bind(&transition.from)
        .bind(&transition.to)
        .bind(fmt_ts(transition.timestamp))
        .bind(&transition.reason)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        job_from_row(&row)
    }

    async fn get_job_metrics(&self) -> Result<fleet_proto::wire::JobMetrics> {
        let rows = sqlx::query("SELECT status, queue, priority, engine, started_at, completed_at FROM jobs")
            .fetch_all(&self.pool)
            .await?;

        let mut by_state: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_queue: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_priority: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_engine: BTreeMap<String, u64> = BTreeMap::new();
        let mut active_jobs = 0u64;
        let mut queue_length = 0u64;
        let mut durations = Vec::new();

        for row in &rows {
            let status: String = row.try_get("status")?;
            let queue: String = row.try_get("queue")?;
            let priority: String = row.try_get("priority")?;
            let engine: String = row.try_get("engine")?;
            *by_state.entry(status.clone()).or_default() += 1;
            *by_queue.entry(queue).or_default() += 1;
            *by_priority.entry(priority).or_default() += 1;
            *by_engine.entry(engine).or_default() += 1;

            if let Some(parsed) = JobStatus::normalize(&status) {
                if parsed.is_active() {
                    active_jobs += 1;
                }
                if parsed.is_assignable() {
                    queue_length += 1;
                }
            }

            let started: Option<String> = row.try_get("started_at")?;
            let completed: Option<String> = row.try_get("completed_at")?;
            if let (Some(s), Some(c)) = (started, completed) {
                let s = schema::parse_ts(&s)?;
                let c = schema::parse_ts(&c)?;
                durations.push((c - s).num_milliseconds() as f64 / 1000.0);
            }
        }

        let avg_duration_secs = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        Ok(fleet_proto::wire::JobMetrics {
            active_jobs,
            queue_length,
            avg_duration_secs,
            by_state,
            by_queue,
            by_priority,
            by_engine,
        })
    }

    async fn delete_job(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM state_transitions WHERE job_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::JobNotFound(id.to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn vacuum(&self) -> Result<()> {
        if let Err(err) = sqlx::query("VACUUM").execute(&self.pool).await {
            tracing::warn!(error = %err, "vacuum skipped (backend does not support it in this context)");
        }
        Ok(())
    }
}

impl AnyStore {
    async fn transitions_for(&self, job_id: Uuid) -> Result<Vec<Transition>> {
        let rows = sqlx::query("SELECT * FROM state_transitions WHERE job_id = ? ORDER BY id")
            .bind(job_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(transition_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_proto::{Engine, NodeType, Priority, Queue};
    use std::collections::{BTreeMap, BTreeSet};

    async fn test_store() -> AnyStore {
        AnyStore::connect("sqlite::memory:").await.expect("connect")
    }

    fn sample_node() -> Node {
        Node {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "worker-1".into(),
            address: "10.0.0.5:9000".into(),
            node_type: NodeType::Server,
            cpu_threads: 16,
            cpu_model: "EPYC".into(),
            has_gpu: true,
            gpu_type: Some("NVIDIA RTX 4000".into()),
            gpu_capabilities: BTreeSet::from(["gpu_h264".to_string()]),
            ram_total_bytes: 64 * 1024 * 1024 * 1024,
            labels: BTreeMap::new(),
            status: NodeStatus::Available,
            last_heartbeat: Utc::now(),
            registered_at: Utc::now(),
            current_job_id: None,
        }
    }

    fn sample_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            sequence_number: 0,
            scenario: "mezzanine-to-hls".into(),
            engine: Engine::Auto,
            confidence: 0.9,
            queue: Queue::Default,
            priority: Priority::Medium,
            parameters: BTreeMap::new(),
            required_capabilities: vec![],
            status: JobStatus::Queued,
            node_id: None,
            retry_count: 0,
            max_retries: 3,
            error: None,
            failure_reason: None,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            state_transitions: vec![],
            wrapper_enabled: false,
            wrapper_constraints: None,
        }
    }

    #[tokio::test]
    async fn register_node_is_idempotent_on_identity() {
        let store = test_store().await;
        let a = store.register_node(sample_node()).await.unwrap();
        let mut dup = sample_node();
        dup.name = a.name.clone();
        dup.address = a.address.clone();
        dup.cpu_threads = 32;
        let b = store.register_node(dup).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.cpu_threads, 32);
        assert_eq!(store.get_all_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_job_assigns_monotonic_sequence_numbers() {
        let store = test_store().await;
        let first = store.create_job(sample_job()).await.unwrap();
        let second = store.create_job(sample_job()).await.unwrap();
        assert!(second.sequence_number > first.sequence_number);
    }

    #[tokio::test]
    async fn transition_job_state_rejects_illegal_transition() {
        let store = test_store().await;
        let job = store.create_job(sample_job()).await.unwrap();
        let err = store
            .transition_job_state(job.id, JobStatus::Queued, JobStatus::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn assign_job_to_worker_is_atomic_across_job_and_node() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();

        let assigned = store.assign_job_to_worker(job.id, node.id).await.unwrap();
        assert_eq!(assigned.status, JobStatus::Assigned);
        assert_eq!(assigned.node_id, Some(node.id));

        let busy_node = store.get_node(node.id).await.unwrap();
        assert_eq!(busy_node.status, NodeStatus::Busy);
        assert_eq!(busy_node.current_job_id, Some(job.id));
    }

    #[tokio::test]
    async fn assign_job_to_worker_rejects_already_busy_node() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job_a = store.create_job(sample_job()).await.unwrap();
        let job_b = store.create_job(sample_job()).await.unwrap();

        store.assign_job_to_worker(job_a.id, node.id).await.unwrap();
        let err = store.assign_job_to_worker(job_b.id, node.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(_)));
    }

    #[tokio::test]
    async fn complete_job_frees_the_node() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job.id, node.id).await.unwrap();
        store
            .transition_job_state(job.id, JobStatus::Assigned, JobStatus::Running, None)
            .await
            .unwrap();

        let completed = store
            .complete_job(job.id, JobStatus::Completed, None, None)
            .await
            .unwrap();
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.completed_at.is_some());

        let freed_node = store.get_node(node.id).await.unwrap();
        assert_eq!(freed_node.status, NodeStatus::Available);
        assert_eq!(freed_node.current_job_id, None);
    }

    #[tokio::test]
    async fn get_job_includes_transition_history() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job.id, node.id).await.unwrap();

        let fetched = store.get_job(job.id).await.unwrap();
        assert_eq!(fetched.state_transitions.len(), 1);
        assert_eq!(fetched.state_transitions[0].to, "assigned");
    }

    #[tokio::test]
    async fn delete_job_removes_transitions_too() {
        let store = test_store().await;
        let job = store.create_job(sample_job()).await.unwrap();
        store.delete_job(job.id).await.unwrap();
        assert!(matches!(store.get_job(job.id).await, Err(StoreError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn fail_job_records_failure_reason_from_queued() {
        let store = test_store().await;
        let job = store.create_job(sample_job()).await.unwrap();

        let rejected = store
            .fail_job(
                job.id,
                JobStatus::Queued,
                JobStatus::Rejected,
                Some("no node advertises a required capability".to_string()),
                Some(FailureReason::ImpossibleCapabilities),
            )
            .await
            .unwrap();

        assert_eq!(rejected.status, JobStatus::Rejected);
        assert_eq!(rejected.failure_reason, Some(FailureReason::ImpossibleCapabilities));
    }

    #[tokio::test]
    async fn fail_job_rejects_retrying_job_too() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job.id, node.id).await.unwrap();
        store
            .transition_job_state(job.id, JobStatus::Assigned, JobStatus::Retrying, None)
            .await
            .unwrap();

        let rejected = store
            .fail_job(
                job.id,
                JobStatus::Retrying,
                JobStatus::Rejected,
                None,
                Some(FailureReason::ImpossibleCapabilities),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, JobStatus::Rejected);
        assert_eq!(rejected.failure_reason, Some(FailureReason::ImpossibleCapabilities));
    }

    #[tokio::test]
    async fn fail_job_does_not_resurrect_offline_node() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job.id, node.id).await.unwrap();
        store
            .transition_job_state(job.id, JobStatus::Assigned, JobStatus::Running, None)
            .await
            .unwrap();

        store.update_node_status(node.id, NodeStatus::Offline).await.unwrap();

        let failed = store
            .fail_job(
                job.id,
                JobStatus::Running,
                JobStatus::Failed,
                Some("worker went offline and retries are exhausted".to_string()),
                Some(FailureReason::MaxRetriesExceeded),
            )
            .await
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);

        let still_offline = store.get_node(node.id).await.unwrap();
        assert_eq!(still_offline.status, NodeStatus::Offline);
        assert_eq!(still_offline.current_job_id, None);
    }

    #[tokio::test]
    async fn transition_job_state_allows_running_to_retrying() {
        let store = test_store().await;
        let node = store.register_node(sample_node()).await.unwrap();
        let job = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job.id, node.id).await.unwrap();
        store
            .transition_job_state(job.id, JobStatus::Assigned, JobStatus::Running, None)
            .await
            .unwrap();

        let retrying = store
            .transition_job_state(job.id, JobStatus::Running, JobStatus::Retrying, Some("worker_died".to_string()))
            .await
            .unwrap();
        assert_eq!(retrying.status, JobStatus::Retrying);
        assert_eq!(retrying.retry_count, 1);
        assert_eq!(retrying.node_id, None);
    }

    #[tokio::test]
    async fn retrying_and_timed_out_jobs_are_cancelable() {
        let store = test_store().await;
        let node_a = store.register_node(sample_node()).await.unwrap();
        let mut node_b_spec = sample_node();
        node_b_spec.name = "worker-2".into();
        node_b_spec.address = "10.0.0.6:9000".into();
        let node_b = store.register_node(node_b_spec).await.unwrap();

        let job_a = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job_a.id, node_a.id).await.unwrap();
        store
            .transition_job_state(job_a.id, JobStatus::Assigned, JobStatus::Retrying, None)
            .await
            .unwrap();
        let canceled_a = store
            .transition_job_state(job_a.id, JobStatus::Retrying, JobStatus::Canceled, None)
            .await
            .unwrap();
        assert_eq!(canceled_a.status, JobStatus::Canceled);
        let freed_a = store.get_node(node_a.id).await.unwrap();
        assert_eq!(freed_a.current_job_id, None);

        let job_b = store.create_job(sample_job()).await.unwrap();
        store.assign_job_to_worker(job_b.id, node_b.id).await.unwrap();
        store
            .transition_job_state(job_b.id, JobStatus::Assigned, JobStatus::Running, None)
            .await
            .unwrap();
        store
            .transition_job_state(job_b.id, JobStatus::Running, JobStatus::TimedOut, None)
            .await
            .unwrap();
        let canceled_b = store
            .transition_job_state(job_b.id, JobStatus::TimedOut, JobStatus::Canceled, None)
            .await
            .unwrap();
        assert_eq!(canceled_b.status, JobStatus::Canceled);
        let freed_b = store.get_node(node_b.id).await.unwrap();
        assert_eq!(freed_b.current_job_id, None);
    }
}
