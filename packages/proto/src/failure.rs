//! Failure reason taxonomy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    PlatformError,
    WorkerDied,
    TransientNetwork,
    RateLimit,
    ResourceExhaustion,
    ValidationError,
    UserError,
    InputError,
    ImpossibleCapabilities,
    MaxRetriesExceeded,
    Timeout,
    /// Default bucket when nothing more specific matches.
    RuntimeError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::PlatformError => "platform_error",
            FailureReason::WorkerDied => "worker_died",
            FailureReason::TransientNetwork => "transient_network",
            FailureReason::RateLimit => "rate_limit",
            FailureReason::ResourceExhaustion => "resource_exhaustion",
            FailureReason::ValidationError => "validation_error",
            FailureReason::UserError => "user_error",
            FailureReason::InputError => "input_error",
            FailureReason::ImpossibleCapabilities => "impossible_capabilities",
            FailureReason::MaxRetriesExceeded => "max_retries_exceeded",
            FailureReason::Timeout => "timeout",
            FailureReason::RuntimeError => "runtime_error",
        }
    }

    /// Classify a raw error message reported by a worker. Checked in
    /// order; first match wins, falling back to `runtime_error`.
    pub fn classify(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        let rules: &[(&[&str], FailureReason)] = &[
            (&["rate limit", "429", "too many requests"], FailureReason::RateLimit),
            (&["disk full", "no space left", "oom", "out of memory"], FailureReason::ResourceExhaustion),
            (&["timed out", "timeout", "deadline exceeded"], FailureReason::Timeout),
            (&["connection reset", "connection refused", "broken pipe", "network"], FailureReason::TransientNetwork),
            (&["invalid input", "malformed", "unsupported codec", "corrupt"], FailureReason::InputError),
            (&["validation", "schema"], FailureReason::ValidationError),
            (&["permission denied", "unauthorized", "forbidden"], FailureReason::UserError),
        ];
        for (needles, reason) in rules {
            if needles.iter().any(|n| m.contains(n)) {
                return *reason;
            }
        }
        FailureReason::RuntimeError
    }

    /// Coarse retryable/non-retryable classification, matching
    /// `seesaw::job::FailureKind`'s two-way split (see `fleet-scheduler`).
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FailureReason::ValidationError
                | FailureReason::UserError
                | FailureReason::InputError
                | FailureReason::ImpossibleCapabilities
                | FailureReason::MaxRetriesExceeded
        )
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_substrings() {
        assert_eq!(FailureReason::classify("connection reset by peer"), FailureReason::TransientNetwork);
        assert_eq!(FailureReason::classify("disk full on /data"), FailureReason::ResourceExhaustion);
        assert_eq!(FailureReason::classify("ffmpeg exited: unsupported codec"), FailureReason::InputError);
    }

    #[test]
    fn unrecognized_message_defaults_to_runtime_error() {
        assert_eq!(FailureReason::classify("something weird happened"), FailureReason::RuntimeError);
    }

    #[test]
    fn retryability_matches_spec_table() {
        assert!(!FailureReason::ImpossibleCapabilities.is_retryable());
        assert!(!FailureReason::MaxRetriesExceeded.is_retryable());
        assert!(FailureReason::WorkerDied.is_retryable());
        assert!(FailureReason::ResourceExhaustion.is_retryable());
    }
}
