//! Output validation for generated artifacts.
//!
//! Runs on text that has already been through `ReasoningDetector::strip`.
//! A rejection sends the orchestrator back to the model; it never edits the text.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::generation::reasoning::ReasoningDetector;
use crate::models::generation::GenerationTask;
use crate::models::job::JobPosting;

/// A tailored CV shorter than this fraction of the source CV is treated as truncated.
pub const MIN_TAILORED_RATIO: f64 = 0.4;

pub const MIN_COVER_LETTER_CHARS: usize = 200;

pub const MAX_PITCH_WORDS: usize = 30;

/// "5 years", "3+ yrs", "10 Jahre".
static YEARS_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?|jahre?n?)\b").expect("static years regex")
});

/// Separators between a scraped title and its site suffix or annotations:
/// "Data Analyst (m/w/d) | Careers at Initech".
static ANCHOR_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s[-\x{2013}\x{2014}\x{00b7}]\s|[|()\[\],:;/]").expect("static anchor separator regex")
});

/// Title or company segments with fewer letters ("m", "w", "d") are too generic to anchor on.
const MIN_ANCHOR_LETTERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("model returned empty output")]
    Empty,

    #[error("output has {chars} chars, below the minimum of {minimum} for this CV")]
    Truncated { chars: usize, minimum: usize },

    #[error("output contains reasoning marker '{0}'")]
    ReasoningLeak(String),

    #[error("cover letter has {0} chars, below the minimum of {}", MIN_COVER_LETTER_CHARS)]
    TooShort(usize),

    #[error("output mentions neither the company nor the job title")]
    OffTarget,

    #[error("output claims '{0}', which the CV does not state")]
    UnsupportedClaim(String),

    #[error("pitch has {0} words, above the maximum of {}", MAX_PITCH_WORDS)]
    TooLong(usize),
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Empty => "EMPTY_OUTPUT",
            Rejection::Truncated { .. } => "TRUNCATED_OUTPUT",
            Rejection::ReasoningLeak(_) => "REASONING_LEAK",
            Rejection::TooShort(_) => "TOO_SHORT",
            Rejection::OffTarget => "OFF_TARGET",
            Rejection::UnsupportedClaim(_) => "UNSUPPORTED_CLAIM",
            Rejection::TooLong(_) => "TOO_LONG",
        }
    }
}

/// Checks one cleaned artifact. The first failing rule wins.
pub fn validate_output(
    task: GenerationTask,
    text: &str,
    cv_text: &str,
    job: &JobPosting,
    detector: &ReasoningDetector,
) -> Result<(), Rejection> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::Empty);
    }

    if let Some(marker) = detector.detect(text) {
        return Err(Rejection::ReasoningLeak(marker));
    }

    match task {
        GenerationTask::TailorCv => check_not_truncated(text, cv_text)?,
        GenerationTask::CoverLetter => {
            let chars = text.chars().count();
            if chars < MIN_COVER_LETTER_CHARS {
                return Err(Rejection::TooShort(chars));
            }
            check_on_target(text, job)?;
        }
        GenerationTask::ShortPitch => {
            let words = text.split_whitespace().count();
            if words > MAX_PITCH_WORDS {
                return Err(Rejection::TooLong(words));
            }
        }
    }

    check_years_claims(text, cv_text)
}

fn check_not_truncated(text: &str, cv_text: &str) -> Result<(), Rejection> {
    let chars = text.chars().count();
    let minimum = (cv_text.trim().chars().count() as f64 * MIN_TAILORED_RATIO).floor() as usize;
    if chars < minimum {
        return Err(Rejection::Truncated { chars, minimum });
    }
    Ok(())
}

/// A letter must name the company or the title, when the posting knows either.
/// Any substantial segment of a scraped title counts.
fn check_on_target(text: &str, job: &JobPosting) -> Result<(), Rejection> {
    let lowered = text.to_lowercase();
    let anchors = target_anchors(job);

    if anchors.is_empty() || anchors.iter().any(|a| lowered.contains(a.as_str())) {
        Ok(())
    } else {
        Err(Rejection::OffTarget)
    }
}

fn target_anchors(job: &JobPosting) -> Vec<String> {
    let mut anchors = Vec::new();
    for field in [&job.company, &job.title] {
        let field = field.trim().to_lowercase();
        if field.is_empty() {
            continue;
        }
        anchors.extend(
            ANCHOR_SEPARATORS
                .split(&field)
                .map(str::trim)
                .filter(|segment| {
                    segment.chars().filter(|c| c.is_alphabetic()).count() >= MIN_ANCHOR_LETTERS
                })
                .map(str::to_string),
        );
        anchors.push(field);
    }
    anchors
}

/// Every "N years" figure in the output must also appear in the CV.
fn check_years_claims(text: &str, cv_text: &str) -> Result<(), Rejection> {
    let stated: HashSet<&str> = YEARS_CLAIM
        .captures_iter(cv_text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    for claim in YEARS_CLAIM.captures_iter(text) {
        let Some(number) = claim.get(1) else {
            continue;
        };
        if !stated.contains(number.as_str()) {
            let phrase = claim.get(0).map_or("", |m| m.as_str());
            return Err(Rejection::UnsupportedClaim(phrase.to_string()));
        }
    }
    Ok(())
}
