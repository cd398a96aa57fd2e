//! Submission-time validation shared between the master API and the CLI.

use thiserror::Error;

use crate::capability::known_capability_tokens;
use crate::wire::SubmitJobRequest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("scenario must not be empty")]
    EmptyScenario,
    #[error("unknown required capability token: {0}")]
    UnknownCapability(String),
    #[error("max_retries must be >= 0")]
    NegativeMaxRetries,
}

pub fn validate_submit_job(req: &SubmitJobRequest) -> Result<(), ValidationError> {
    if req.scenario.trim().is_empty() {
        return Err(ValidationError::EmptyScenario);
    }
    if let Some(max_retries) = req.max_retries {
        if max_retries < 0 {
            return Err(ValidationError::NegativeMaxRetries);
        }
    }
    let known = known_capability_tokens();
    for cap in &req.required_capabilities {
        if !known.contains(&cap.as_str()) {
            return Err(ValidationError::UnknownCapability(cap.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn base_request() -> SubmitJobRequest {
        SubmitJobRequest {
            scenario: "standard_1080p".into(),
            engine: Default::default(),
            confidence: 1.0,
            queue: Default::default(),
            priority: Default::default(),
            parameters: BTreeMap::new(),
            required_capabilities: vec![],
            max_retries: None,
            wrapper_enabled: None,
            wrapper_constraints: None,
        }
    }

    #[test]
    fn rejects_empty_scenario() {
        let mut req = base_request();
        req.scenario = "  ".into();
        assert_eq!(validate_submit_job(&req), Err(ValidationError::EmptyScenario));
    }

    #[test]
    fn rejects_unknown_capability() {
        let mut req = base_request();
        req.required_capabilities = vec!["teleport".into()];
        assert_eq!(
            validate_submit_job(&req),
            Err(ValidationError::UnknownCapability("teleport".into()))
        );
    }

    #[test]
    fn accepts_known_capability() {
        let mut req = base_request();
        req.required_capabilities = vec!["nvenc_h264".into()];
        assert!(validate_submit_job(&req).is_ok());
    }
}
