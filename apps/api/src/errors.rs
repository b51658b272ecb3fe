use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::generation::GenerationError;
use crate::jobs::JobError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Structured error entry: which stage failed, a stable code, and what the caller can do.
/// Used for error responses and for per-task failures inside a generation response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

const HINT_MANUAL_JOB: &str =
    "The job page could not be read automatically. Paste the job description instead.";
const HINT_REUPLOAD_CV: &str = "Upload a text-based PDF or a DOCX version of your CV.";
const HINT_MODEL_SERVER: &str = "Check that the local model server is running and reachable.";
const HINT_PICK_MODEL: &str = "Pick one of the models listed by the model server.";
const HINT_RETRY_GENERATION: &str =
    "Try generating again, or lower the temperature / pick a different model.";

impl ExtractError {
    pub fn detail(&self) -> ErrorDetail {
        let code = match self {
            ExtractError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ExtractError::CorruptDocument { .. } => "CORRUPT_DOCUMENT",
            ExtractError::NoExtractableText(_) => "NO_EXTRACTABLE_TEXT",
        };
        detail(code, "document_extraction", self, Some(HINT_REUPLOAD_CV))
    }
}

impl JobError {
    pub fn detail(&self) -> ErrorDetail {
        let code = match self {
            JobError::InvalidUrl(_) => "VALIDATION_ERROR",
            JobError::Fetch { .. } => "FETCH_ERROR",
            JobError::Parse { .. } => "PARSE_ERROR",
        };
        detail(code, "job_fetch", self, Some(HINT_MANUAL_JOB))
    }
}

impl LlmError {
    pub fn code(&self) -> &'static str {
        match self {
            LlmError::Unavailable(_) => "MODEL_UNAVAILABLE",
            _ => "MODEL_ERROR",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let hint = match self {
            LlmError::UnknownModel(_) => HINT_PICK_MODEL,
            _ => HINT_MODEL_SERVER,
        };
        detail(self.code(), "model_invocation", self, Some(hint))
    }
}

impl GenerationError {
    pub fn detail(&self) -> ErrorDetail {
        match self {
            GenerationError::Failed {
                task,
                attempts,
                reason,
                last_output,
            } => ErrorDetail {
                code: "GENERATION_FAILED",
                stage: "generation",
                message: self.to_string(),
                hint: Some(match reason.model_error() {
                    Some(LlmError::UnknownModel(_)) => HINT_PICK_MODEL,
                    Some(LlmError::Unavailable(_)) => HINT_MODEL_SERVER,
                    _ => HINT_RETRY_GENERATION,
                }),
                diagnostics: Some(json!({
                    "task": task,
                    "attempts": attempts,
                    "cause_code": reason.code(),
                    "last_attempt": last_output,
                })),
            },
            GenerationError::InvalidSettings(_) => {
                detail("VALIDATION_ERROR", "generation", self, None)
            }
            GenerationError::StateMachine(_) => detail("INTERNAL_ERROR", "generation", self, None),
        }
    }
}

fn detail(
    code: &'static str,
    stage: &'static str,
    error: &impl std::fmt::Display,
    hint: Option<&'static str>,
) -> ErrorDetail {
    ErrorDetail {
        code,
        stage,
        message: error.to_string(),
        hint,
        diagnostics: None,
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR",
                    stage: "request",
                    message: msg.clone(),
                    hint: None,
                    diagnostics: None,
                },
            ),
            AppError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                detail("PAYLOAD_TOO_LARGE", "request", self, Some(HINT_REUPLOAD_CV)),
            ),
            AppError::Extract(e) => {
                let status = match e {
                    ExtractError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.detail())
            }
            AppError::Job(e) => {
                let status = match e {
                    JobError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                    JobError::Fetch { .. } => StatusCode::BAD_GATEWAY,
                    JobError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.detail())
            }
            AppError::Llm(e) => {
                tracing::error!("Model error: {e}");
                let status = match e {
                    LlmError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.detail())
            }
            AppError::Generation(e) => {
                let status = match e {
                    GenerationError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
                    GenerationError::Failed { .. } => {
                        tracing::error!("Generation error: {e}");
                        StatusCode::BAD_GATEWAY
                    }
                    GenerationError::StateMachine(_) => {
                        tracing::error!("Generation error: {e}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.detail())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetail {
                        code: "INTERNAL_ERROR",
                        stage: "internal",
                        message: "An internal server error occurred".to_string(),
                        hint: None,
                        diagnostics: None,
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "error": detail }))).into_response()
    }
}
