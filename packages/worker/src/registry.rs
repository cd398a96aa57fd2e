//! Tracks the cancellation token for each currently-executing job so the
//! heartbeat loop can cancel a specific in-flight run when it learns the
//! master has moved that job to `canceled` or `paused`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct JobCancelRegistry {
    inner: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl JobCancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: Uuid, token: CancellationToken) {
        self.inner.lock().expect("registry mutex poisoned").insert(job_id, token);
    }

    pub fn remove(&self, job_id: Uuid) {
        self.inner.lock().expect("registry mutex poisoned").remove(&job_id);
    }

    /// Cancels the job's token if it is still tracked. A no-op if the job
    /// already finished and was removed.
    pub fn cancel(&self, job_id: Uuid) {
        if let Some(token) = self.inner.lock().expect("registry mutex poisoned").get(&job_id) {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_a_no_op_for_untracked_jobs() {
        let registry = JobCancelRegistry::new();
        registry.cancel(Uuid::new_v4());
    }

    #[test]
    fn cancel_fires_the_registered_token() {
        let registry = JobCancelRegistry::new();
        let job_id = Uuid::new_v4();
        let token = CancellationToken::new();
        registry.register(job_id, token.clone());
        registry.cancel(job_id);
        assert!(token.is_cancelled());
    }

    #[test]
    fn remove_drops_tracking_without_canceling() {
        let registry = JobCancelRegistry::new();
        let job_id = Uuid::new_v4();
        let token = CancellationToken::new();
        registry.register(job_id, token.clone());
        registry.remove(job_id);
        registry.cancel(job_id);
        assert!(!token.is_cancelled());
    }
}
