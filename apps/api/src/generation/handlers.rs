//! Axum route handlers for the Generation API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::generator::GenerateResponse;
use crate::generation::GenerationSettings;
use crate::models::generation::GenerationTask;
use crate::models::job::JobPosting;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

fn default_tasks() -> Vec<GenerationTask> {
    vec![GenerationTask::TailorCv, GenerationTask::CoverLetter]
}

/// Settings fields are optional; missing ones come from the server configuration.
#[derive(Debug, Deserialize)]
pub struct GenerateRequestBody {
    pub cv_text: String,
    pub job: JobPosting,
    #[serde(default = "default_tasks")]
    pub tasks: Vec<GenerationTask>,
    pub model_id: Option<String>,
    pub temperature: Option<f32>,
    pub max_attempts: Option<u32>,
}

impl GenerateRequestBody {
    fn settings(&self, defaults: GenerationSettings) -> GenerationSettings {
        GenerationSettings {
            model_id: self.model_id.clone().unwrap_or(defaults.model_id),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate
///
/// Runs the selected tasks in order. Responds 200 when at least one artifact was
/// produced (failed tasks are listed in `errors`), otherwise with the failure.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequestBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    if body.cv_text.trim().is_empty() {
        return Err(AppError::Validation("cv_text cannot be empty".to_string()));
    }
    if body.job.description.trim().is_empty() {
        return Err(AppError::Validation(
            "job.description cannot be empty".to_string(),
        ));
    }

    let settings = body.settings(state.config.generation_defaults());
    let response = state
        .generator
        .generate_all(&body.cv_text, &body.job, &body.tasks, &settings)
        .await?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_defaults_to_cv_and_letter() {
        let body: GenerateRequestBody = serde_json::from_value(serde_json::json!({
            "cv_text": "Jane Doe",
            "job": {
                "title": "Analyst",
                "company": "Acme",
                "description": "SQL",
                "location": null,
                "source_url": null,
                "source": "Manual"
            }
        }))
        .unwrap();
        assert_eq!(body.tasks, default_tasks());
        assert!(body.model_id.is_none());
    }

    #[test]
    fn test_body_overrides_defaults() {
        let body: GenerateRequestBody = serde_json::from_value(serde_json::json!({
            "cv_text": "Jane Doe",
            "job": {
                "title": "", "company": "", "description": "SQL",
                "location": null, "source_url": null, "source": "Generic"
            },
            "tasks": ["short_pitch"],
            "temperature": 0.2
        }))
        .unwrap();
        let settings = body.settings(GenerationSettings {
            model_id: "llama3".into(),
            temperature: 0.7,
            max_attempts: 3,
        });
        assert_eq!(settings.model_id, "llama3");
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(body.tasks, vec![GenerationTask::ShortPitch]);
    }
}
