use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::job::JobPosting;

/// The artifacts the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    TailorCv,
    CoverLetter,
    ShortPitch,
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TailorCv => write!(f, "tailored CV"),
            Self::CoverLetter => write!(f, "cover letter"),
            Self::ShortPitch => write!(f, "short pitch"),
        }
    }
}

/// One artifact to generate, built by the generator per task.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub cv_text: String,
    pub job: JobPosting,
    pub model_id: String,
    /// Within [0, 1].
    pub temperature: f32,
    pub task: GenerationTask,
}

/// Text returned by the model client and how many calls it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub text: String,
    pub attempts: u32,
    pub succeeded: bool,
}
