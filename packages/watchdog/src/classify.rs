//! Attach-error classification. Mirrors the shape of
//! `fleet_proto::FailureReason::classify` — substring rules over the
//! reported message, first match wins, default to `unknown`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
    RateLimit,
    Resource,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Permanent => "permanent",
            ErrorClass::RateLimit => "rate_limit",
            ErrorClass::Resource => "resource",
            ErrorClass::Unknown => "unknown",
        }
    }

    /// All classes but `permanent` are retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::Permanent)
    }

    pub fn classify(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        let rules: &[(&[&str], ErrorClass)] = &[
            (&["rate limit", "429", "too many requests"], ErrorClass::RateLimit),
            (&["no space left", "disk full", "oom", "out of memory", "cannot allocate"], ErrorClass::Resource),
            (&["invalid configuration", "schema", "validation"], ErrorClass::Permanent),
            (&["does not exist", "no such process", "connection reset", "temporarily unavailable", "i/o error"], ErrorClass::Transient),
        ];
        for (needles, class) in rules {
            if needles.iter().any(|n| m.contains(n)) {
                return *class;
            }
        }
        ErrorClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_process_exit_race_as_transient() {
        assert_eq!(ErrorClass::classify("pid 1234 does not exist"), ErrorClass::Transient);
    }

    #[test]
    fn classifies_schema_errors_as_permanent_and_non_retryable() {
        let class = ErrorClass::classify("invalid configuration: schema mismatch");
        assert_eq!(class, ErrorClass::Permanent);
        assert!(!class.is_retryable());
    }

    #[test]
    fn unrecognized_message_is_unknown_but_retryable() {
        let class = ErrorClass::classify("something unexpected happened");
        assert_eq!(class, ErrorClass::Unknown);
        assert!(class.is_retryable());
    }
}
