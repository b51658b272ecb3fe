//! Axum route handlers for the Job API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::{JobPosting, ManualJobInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchJobRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: JobPosting,
}

/// POST /api/v1/jobs/fetch
///
/// Scrapes a job page. On `FETCH_ERROR` / `PARSE_ERROR` the client should
/// offer the manual-paste route instead.
pub async fn handle_fetch_job(
    State(state): State<AppState>,
    Json(request): Json<FetchJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.fetcher.fetch(&request.url).await?;
    Ok(Json(JobResponse { job }))
}

/// POST /api/v1/jobs/manual
///
/// Builds a posting from pasted text. No network access.
pub async fn handle_manual_job(
    Json(input): Json<ManualJobInput>,
) -> Result<Json<JobResponse>, AppError> {
    let job = JobPosting::from_manual(input).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(JobResponse { job }))
}
