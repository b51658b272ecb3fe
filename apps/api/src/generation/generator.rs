//! Artifact generation: prompt → model → strip → validate → retry.
//!
//! Each artifact runs a small state machine:
//! `Pending → Prompting → AwaitingModel → Validating → {Succeeded | Retrying → AwaitingModel | Failed}`.
//! The visited path is returned with the outcome. Model-client errors end the
//! run at once (the client already retried transport failures); validation
//! rejections retry with a lower temperature until the budget is spent.
//! Failed attempts are never merged or returned as the artifact.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::ErrorDetail;
use crate::generation::candidate::CandidateProfile;
use crate::generation::keywords::emphasized_keywords;
use crate::generation::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, SEE_CV, SHORT_PITCH_PROMPT_TEMPLATE,
    SHORT_PITCH_SYSTEM, TAILOR_CV_PROMPT_TEMPLATE, TAILOR_CV_SYSTEM,
};
use crate::generation::reasoning::ReasoningDetector;
use crate::generation::validation::{validate_output, MAX_PITCH_WORDS};
use crate::generation::{FailureReason, GenerationError, GenerationSettings};
use crate::llm_client::prompts::{NO_FABRICATION_INSTRUCTION, NO_REASONING_INSTRUCTION};
use crate::llm_client::{LlmClient, ModelCall};
use crate::models::generation::{GenerationRequest, GenerationResult, GenerationTask};
use crate::models::job::JobPosting;
use crate::retry::Backoff;
use crate::text::truncate_at_word;

/// Job descriptions longer than this are cut on a word boundary in prompts.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 4000;

const TEMPERATURE_STEP: f32 = 0.1;
const TEMPERATURE_FLOOR: f32 = 0.3;
const PITCH_TEMPERATURE: f32 = 0.3;

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactState {
    Pending,
    Prompting,
    AwaitingModel,
    Validating,
    Retrying,
    Succeeded,
    Failed,
}

impl ArtifactState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ArtifactState::Succeeded | ArtifactState::Failed)
    }

    pub fn can_advance_to(self, next: ArtifactState) -> bool {
        use ArtifactState::*;
        matches!(
            (self, next),
            (Pending, Prompting)
                | (Prompting, AwaitingModel)
                | (AwaitingModel, Validating)
                | (AwaitingModel, Failed)
                | (Validating, Succeeded)
                | (Validating, Retrying)
                | (Validating, Failed)
                | (Retrying, AwaitingModel)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Illegal artifact state transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: ArtifactState,
    pub to: ArtifactState,
}

/// Lifecycle of one artifact.
#[derive(Debug, Clone)]
pub struct ArtifactRun {
    task: GenerationTask,
    state: ArtifactState,
    path: Vec<ArtifactState>,
}

impl ArtifactRun {
    pub fn new(task: GenerationTask) -> Self {
        Self {
            task,
            state: ArtifactState::Pending,
            path: vec![ArtifactState::Pending],
        }
    }

    pub fn advance(&mut self, next: ArtifactState) -> Result<(), IllegalTransition> {
        if !self.state.can_advance_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("{}: {:?} -> {:?}", self.task, self.state, next);
        self.state = next;
        self.path.push(next);
        if next.is_terminal() {
            debug!("{} finished: {:?}", self.task, self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &[ArtifactState] {
        &self.path
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A validated artifact. `result.attempts` counts orchestrator attempts.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub task: GenerationTask,
    #[serde(flatten)]
    pub result: GenerationResult,
    pub path: Vec<ArtifactState>,
}

/// Everything one generate call produced. Per-task failures are listed in
/// `errors` so a failed cover letter does not discard a finished CV.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailored_cv: Option<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_pitch: Option<ArtifactOutcome>,
    pub emphasized_keywords: Vec<String>,
    pub errors: Vec<ErrorDetail>,
}

impl GenerateResponse {
    fn store(&mut self, outcome: ArtifactOutcome) {
        let slot = match outcome.task {
            GenerationTask::TailorCv => &mut self.tailored_cv,
            GenerationTask::CoverLetter => &mut self.cover_letter,
            GenerationTask::ShortPitch => &mut self.short_pitch,
        };
        *slot = Some(outcome);
    }

    fn texts(&self) -> Vec<&str> {
        [&self.tailored_cv, &self.cover_letter, &self.short_pitch]
            .into_iter()
            .flatten()
            .map(|o| o.result.text.as_str())
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Generator {
    llm: LlmClient,
    detector: Arc<ReasoningDetector>,
    backoff: Backoff,
}

impl Generator {
    pub fn new(llm: LlmClient, detector: ReasoningDetector, backoff: Backoff) -> Self {
        Self {
            llm,
            detector: Arc::new(detector),
            backoff,
        }
    }

    /// Produces one validated artifact or `GenerationError::Failed` carrying the
    /// last raw model output for diagnostics.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        max_attempts: u32,
    ) -> Result<ArtifactOutcome, GenerationError> {
        let task = request.task;
        let max_attempts = max_attempts.max(1);
        let mut run = ArtifactRun::new(task);

        run.advance(ArtifactState::Prompting)?;
        let mut call = build_model_call(request);
        let start_temperature = call.temperature;
        debug!(
            "Built {task} prompt: {} chars, model={}",
            call.prompt.len(),
            call.model_id
        );

        run.advance(ArtifactState::AwaitingModel)?;
        let mut attempt: u32 = 1;
        let mut last_output: Option<String> = None;

        loop {
            call.temperature = temperature_for_attempt(start_temperature, attempt);
            info!(
                "Generating {task}: attempt {attempt}/{max_attempts}, temperature {:.2}",
                call.temperature
            );

            let raw = match self.llm.generate(&call, max_attempts).await {
                Ok(result) => result.text,
                Err(e) => {
                    run.advance(ArtifactState::Failed)?;
                    warn!("Generating {task} failed: model error: {e}");
                    return Err(GenerationError::Failed {
                        task,
                        attempts: attempt,
                        reason: FailureReason::Model(e),
                        last_output,
                    });
                }
            };

            run.advance(ArtifactState::Validating)?;
            let cleaned = clean_output(task, &raw, &self.detector);

            match validate_output(task, &cleaned, &request.cv_text, &request.job, &self.detector) {
                Ok(()) => {
                    run.advance(ArtifactState::Succeeded)?;
                    info!(
                        "Generated {task} in {attempt} attempt(s): {} chars",
                        cleaned.chars().count()
                    );
                    return Ok(ArtifactOutcome {
                        task,
                        result: GenerationResult {
                            text: cleaned,
                            attempts: attempt,
                            succeeded: true,
                        },
                        path: run.path().to_vec(),
                    });
                }
                Err(rejection) if attempt < max_attempts => {
                    warn!(
                        "Generating {task}: attempt {attempt}/{max_attempts} rejected ({rejection}), retrying..."
                    );
                    run.advance(ArtifactState::Retrying)?;
                    last_output = Some(raw);
                    tokio::time::sleep(self.backoff.delay_for(attempt)).await;
                    attempt += 1;
                    run.advance(ArtifactState::AwaitingModel)?;
                }
                Err(rejection) => {
                    run.advance(ArtifactState::Failed)?;
                    warn!("Generating {task} failed after {attempt} attempt(s): {rejection}");
                    return Err(GenerationError::Failed {
                        task,
                        attempts: attempt,
                        reason: FailureReason::Rejected(rejection),
                        last_output: Some(raw),
                    });
                }
            }
        }
    }

    /// Runs the selected tasks one after another. Fails only when the settings are
    /// invalid or when no task produced an artifact; partial failures are listed
    /// in `errors`.
    pub async fn generate_all(
        &self,
        cv_text: &str,
        job: &JobPosting,
        tasks: &[GenerationTask],
        settings: &GenerationSettings,
    ) -> Result<GenerateResponse, GenerationError> {
        settings.validate()?;

        let mut unique: Vec<GenerationTask> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !unique.contains(task) {
                unique.push(*task);
            }
        }
        if unique.is_empty() {
            return Err(GenerationError::InvalidSettings(
                "select at least one task".to_string(),
            ));
        }

        let mut response = GenerateResponse::default();
        let mut first_failure: Option<GenerationError> = None;

        for task in unique {
            let request = GenerationRequest {
                cv_text: cv_text.to_string(),
                job: job.clone(),
                model_id: settings.model_id.clone(),
                temperature: settings.temperature,
                task,
            };

            match self.generate(&request, settings.max_attempts).await {
                Ok(outcome) => response.store(outcome),
                Err(e @ GenerationError::Failed { .. }) => {
                    response.errors.push(e.detail());
                    first_failure.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        let texts = response.texts();
        if texts.is_empty() {
            if let Some(failure) = first_failure {
                return Err(failure);
            }
        }

        let job_text = format!("{}\n{}", job.title, job.description);
        let keywords = emphasized_keywords(&job_text, cv_text, &texts);
        response.emphasized_keywords = keywords;
        Ok(response)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic prompt for one request: same request, same call.
pub fn build_model_call(request: &GenerationRequest) -> ModelCall {
    let job = &request.job;
    let job_description = truncate_at_word(&job.description, MAX_JOB_DESCRIPTION_CHARS);
    let profile = CandidateProfile::from_cv(&request.cv_text);
    let max_words = MAX_PITCH_WORDS.to_string();

    let (system, template, temperature) = match request.task {
        GenerationTask::TailorCv => (TAILOR_CV_SYSTEM, TAILOR_CV_PROMPT_TEMPLATE, request.temperature),
        GenerationTask::CoverLetter => (
            COVER_LETTER_SYSTEM,
            COVER_LETTER_PROMPT_TEMPLATE,
            request.temperature,
        ),
        GenerationTask::ShortPitch => (
            SHORT_PITCH_SYSTEM,
            SHORT_PITCH_PROMPT_TEMPLATE,
            request.temperature.min(PITCH_TEMPERATURE),
        ),
    };

    let prompt = render(
        template,
        &[
            ("no_fabrication", NO_FABRICATION_INSTRUCTION),
            ("no_reasoning", NO_REASONING_INSTRUCTION),
            ("job_title", job.display_title()),
            ("company", job.display_company()),
            ("job_description", &job_description),
            ("max_words", &max_words),
            ("candidate_name", profile.name.as_deref().unwrap_or(SEE_CV)),
            ("candidate_headline", profile.headline.as_deref().unwrap_or(SEE_CV)),
            ("candidate_skills", profile.skills.as_deref().unwrap_or(SEE_CV)),
            (
                "candidate_achievements",
                profile.achievements.as_deref().unwrap_or(SEE_CV),
            ),
            ("cv_text", request.cv_text.trim()),
        ],
    );

    ModelCall {
        model_id: request.model_id.clone(),
        system: Some(system.to_string()),
        prompt,
        temperature,
    }
}

/// Single-pass `{key}` substitution. Inserted values are never re-scanned, so
/// braces inside a CV or job description stay as written.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let substitution = tail[1..].find('}').and_then(|end| {
            let key = &tail[1..1 + end];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, end + 2))
        });
        match substitution {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Lowers the temperature by one step per retry, down to the floor, never
/// above the starting value.
fn temperature_for_attempt(start: f32, attempt: u32) -> f32 {
    let floor = TEMPERATURE_FLOOR.min(start);
    let decayed = start - TEMPERATURE_STEP * attempt.saturating_sub(1) as f32;
    decayed.max(floor)
}

fn clean_output(task: GenerationTask, raw: &str, detector: &ReasoningDetector) -> String {
    let stripped = detector.strip(raw);
    match task {
        GenerationTask::ShortPitch => first_sentence(&stripped),
        _ => stripped,
    }
}

/// The first sentence of the first non-empty line, without wrapping quotes.
fn first_sentence(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .trim_matches('"');

    let end = line
        .char_indices()
        .zip(line.chars().skip(1))
        .find(|((_, c), next)| matches!(c, '.' | '!' | '?') && next.is_whitespace())
        .map(|((i, c), _)| i + c.len_utf8());

    match end {
        Some(end) => line[..end].to_string(),
        None => line.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
