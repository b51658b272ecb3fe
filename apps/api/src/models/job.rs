use serde::{Deserialize, Serialize};

/// Where a job record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobSource {
    LinkedIn,
    Indeed,
    StepStone,
    Generic,
    Manual,
}

/// A structured job record: produced by the fetcher or by manual paste,
/// consumed by generation. Lives for one request.
///
/// `description` is never empty. `title` and `company` are empty when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: Option<String>,
    pub source_url: Option<String>,
    pub source: JobSource,
}

/// Raw fields a caller pastes when the fetcher cannot reach or read the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualJobInput {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Job description is required")]
pub struct MissingDescription;

impl JobPosting {
    /// Builds a posting from scraped fields. Returns `None` when the description is blank.
    pub fn scraped(
        title: Option<String>,
        company: Option<String>,
        location: Option<String>,
        description: String,
        source_url: &str,
        source: JobSource,
    ) -> Option<Self> {
        let description = description.trim().to_string();
        if description.is_empty() {
            return None;
        }
        Some(Self {
            title: clean_field(title),
            company: clean_field(company),
            description,
            location: non_blank(location),
            source_url: Some(source_url.to_string()),
            source,
        })
    }

    /// Builds a posting from user-pasted text, bypassing the fetcher entirely.
    pub fn from_manual(input: ManualJobInput) -> Result<Self, MissingDescription> {
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(MissingDescription);
        }
        Ok(Self {
            title: clean_field(input.title),
            company: clean_field(input.company),
            description,
            location: non_blank(input.location),
            source_url: None,
            source: JobSource::Manual,
        })
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "the position"
        } else {
            &self.title
        }
    }

    pub fn display_company(&self) -> &str {
        if self.company.is_empty() {
            "your company"
        } else {
            &self.company
        }
    }
}

fn clean_field(value: Option<String>) -> String {
    non_blank(value).unwrap_or_default()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}
