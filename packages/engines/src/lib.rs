//! Transcoder engine polymorphism.
//!
//! `Ffmpeg` and `Gstreamer` are variants with a shared capability:
//! `build_command(job, master_url) -> argv`. Constructing the actual flags a
//! production transcode would need is out of scope here; this crate models
//! the *seam* workers and the scheduler dispatch through, not the transcoder
//! binaries themselves.

use fleet_proto::{Engine, Job};

/// Shared capability every transcoder engine variant implements.
pub trait TranscodeEngine {
    /// Builds the argv a worker would exec to run this job, reporting
    /// progress back to `master_url`. The returned vector's first element is
    /// the program name.
    fn build_command(&self, job: &Job, master_url: &str) -> Vec<String>;

    fn name(&self) -> &'static str;
}

pub struct FfmpegEngine;

impl TranscodeEngine for FfmpegEngine {
    fn build_command(&self, job: &Job, master_url: &str) -> Vec<String> {
        vec![
            "ffmpeg".to_string(),
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            format!("job://{}/input", job.id),
            "-progress".to_string(),
            format!("{master_url}/v1/jobs/{}/progress", job.id),
        ]
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

pub struct GstreamerEngine;

impl TranscodeEngine for GstreamerEngine {
    fn build_command(&self, job: &Job, master_url: &str) -> Vec<String> {
        vec![
            "gst-launch-1.0".to_string(),
            "-e".to_string(),
            format!("uridecodebin uri=job://{}/input", job.id),
            format!("--progress-url={master_url}/v1/jobs/{}/progress", job.id),
        ]
    }

    fn name(&self) -> &'static str {
        "gstreamer"
    }
}

/// Resolves `job.engine` to a concrete engine, following `Engine::resolve`'s
/// scenario-based auto-selection.
pub fn resolve_engine(job: &Job) -> Box<dyn TranscodeEngine + Send + Sync> {
    match job.engine.resolve(&job.scenario) {
        Engine::Gstreamer => Box::new(GstreamerEngine),
        _ => Box::new(FfmpegEngine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_proto::{JobStatus, Priority, Queue};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn sample_job(scenario: &str, engine: Engine) -> Job {
        Job {
            id: Uuid::new_v4(),
            sequence_number: 1,
            scenario: scenario.to_string(),
            engine,
            confidence: 1.0,
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
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            state_transitions: vec![],
            wrapper_enabled: false,
            wrapper_constraints: None,
        }
    }

    #[test]
    fn auto_resolves_to_ffmpeg_by_default() {
        let job = sample_job("mezzanine-to-hls", Engine::Auto);
        assert_eq!(resolve_engine(&job).name(), "ffmpeg");
    }

    #[test]
    fn auto_resolves_to_gstreamer_when_scenario_says_so() {
        let job = sample_job("live-gstreamer-pipeline", Engine::Auto);
        assert_eq!(resolve_engine(&job).name(), "gstreamer");
    }

    #[test]
    fn explicit_engine_choice_is_not_overridden() {
        let job = sample_job("live-gstreamer-pipeline", Engine::Ffmpeg);
        assert_eq!(resolve_engine(&job).name(), "ffmpeg");
    }

    #[test]
    fn build_command_embeds_job_id_and_progress_url() {
        let job = sample_job("mezzanine-to-hls", Engine::Ffmpeg);
        let argv = FfmpegEngine.build_command(&job, "https://master.internal");
        assert_eq!(argv[0], "ffmpeg");
        assert!(argv.iter().any(|a| a.contains(&job.id.to_string())));
    }
}
