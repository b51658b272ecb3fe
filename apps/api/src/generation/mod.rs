// Tailoring/Generation Orchestrator.
// Builds per-task prompts, calls the model through llm_client, validates the
// output and retries. All model traffic goes through LlmClient.

pub mod candidate;
pub mod generator;
pub mod handlers;
pub mod keywords;
pub mod prompts;
pub mod reasoning;
pub mod validation;

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::generation::GenerationTask;
use crate::retry::MAX_ATTEMPTS_LIMIT;
use generator::IllegalTransition;
use validation::Rejection;

/// Model parameters for one generate call. Passed explicitly, never global.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationSettings {
    pub model_id: String,
    /// Within [0, 1].
    pub temperature: f32,
    /// Validation retry budget per artifact; also the model client's transport budget.
    pub max_attempts: u32,
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.model_id.trim().is_empty() {
            return Err(GenerationError::InvalidSettings(
                "model_id cannot be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(GenerationError::InvalidSettings(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.max_attempts) {
            return Err(GenerationError::InvalidSettings(format!(
                "max_attempts must be within [1, {MAX_ATTEMPTS_LIMIT}], got {}",
                self.max_attempts
            )));
        }
        Ok(())
    }
}

/// Why the last attempt of an artifact failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The model client gave up; generation stops on the first such error.
    Model(LlmError),
    /// The output reached the validator and was rejected on every attempt.
    Rejected(Rejection),
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::Model(e) => e.code(),
            FailureReason::Rejected(r) => r.code(),
        }
    }

    pub fn model_error(&self) -> Option<&LlmError> {
        match self {
            FailureReason::Model(e) => Some(e),
            FailureReason::Rejected(_) => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Model(e) => write!(f, "{e}"),
            FailureReason::Rejected(r) => write!(f, "output rejected: {r}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid generation settings: {0}")]
    InvalidSettings(String),

    /// `last_output` is the final raw model text, kept for diagnostics only.
    #[error("Failed to generate {task} after {attempts} attempt(s): {reason}")]
    Failed {
        task: GenerationTask,
        attempts: u32,
        reason: FailureReason,
        last_output: Option<String>,
    },

    #[error(transparent)]
    StateMachine(#[from] IllegalTransition),
}
