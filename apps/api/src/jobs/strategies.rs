//! Extraction strategies: one per known job site, plus the generic fallback.
//!
//! Strategies are pure functions of the downloaded page, so each one can be
//! re-run on a fresh download without coordination. `StrategyTable` holds them
//! in priority order; the generic strategy matches every URL and is always last.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::jobs::html::{
    body_text, first_block, first_text, fragment_to_text, has_login_form, largest_text_block,
    meta_content,
};
use crate::jobs::JobError;
use crate::models::job::{JobPosting, JobSource};
use crate::text::truncate_at_word;

/// Upper bound on a heuristically extracted description.
const MAX_GENERIC_DESCRIPTION_CHARS: usize = 6000;

/// Fields a strategy managed to read. Anything may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl Extraction {
    /// A posting is usable only with a description.
    pub fn is_complete(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Fills fields that are missing here from `other`.
    pub fn or(self, other: Extraction) -> Extraction {
        Extraction {
            title: self.title.or(other.title),
            company: self.company.or(other.company),
            location: self.location.or(other.location),
            description: self
                .description
                .filter(|d| !d.trim().is_empty())
                .or(other.description),
        }
    }
}

/// The capability every extraction strategy provides.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> JobSource;
    fn matches(&self, url: &Url) -> bool;
    fn extract(&self, page: &Html) -> Extraction;
}

// ────────────────────────────────────────────────────────────────────────────
// Site strategies
// ────────────────────────────────────────────────────────────────────────────

/// Selector-driven strategy for a job board whose host carries `host_label`
/// (`linkedin` matches `www.linkedin.com` and `de.linkedin.com`; `stepstone`
/// matches every regional StepStone domain).
pub struct SiteStrategy {
    pub name: &'static str,
    pub source: JobSource,
    pub host_label: &'static str,
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub description: &'static [&'static str],
}

impl ExtractionStrategy for SiteStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn source(&self) -> JobSource {
        self.source
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| {
                host.to_ascii_lowercase()
                    .split('.')
                    .any(|label| label == self.host_label)
            })
            .unwrap_or(false)
    }

    fn extract(&self, page: &Html) -> Extraction {
        Extraction {
            title: first_text(page, self.title),
            company: first_text(page, self.company),
            location: first_text(page, self.location),
            description: first_block(page, self.description),
        }
    }
}

pub const LINKEDIN: SiteStrategy = SiteStrategy {
    name: "linkedin",
    source: JobSource::LinkedIn,
    host_label: "linkedin",
    title: &["h1.top-card-layout__title", "h1.topcard__title", "h1"],
    company: &["a.topcard__org-name-link", "span.topcard__flavor"],
    location: &["span.topcard__flavor--bullet"],
    description: &["div.description__text", "div.show-more-less-html__markup"],
};

pub const INDEED: SiteStrategy = SiteStrategy {
    name: "indeed",
    source: JobSource::Indeed,
    host_label: "indeed",
    title: &["h1.jobsearch-JobInfoHeader-title", "h1"],
    company: &[
        "div[data-company-name]",
        r#"[data-testid="inlineHeader-companyName"]"#,
    ],
    location: &[
        r#"div[data-testid="job-location"]"#,
        r#"[data-testid="inlineHeader-companyLocation"]"#,
    ],
    description: &["div#jobDescriptionText"],
};

pub const STEPSTONE: SiteStrategy = SiteStrategy {
    name: "stepstone",
    source: JobSource::StepStone,
    host_label: "stepstone",
    title: &[r#"h1[data-at="header-job-title"]"#, "h1"],
    company: &[r#"span[data-at="header-company-name"]"#],
    location: &[r#"span[data-at="job-location"]"#],
    description: &[
        r#"div[data-at="jobdescription-content"]"#,
        r#"[data-at="job-ad-content"]"#,
    ],
};

// ────────────────────────────────────────────────────────────────────────────
// Generic fallback
// ────────────────────────────────────────────────────────────────────────────

/// Works on any page: schema.org `JobPosting` JSON-LD first, then common HTML
/// structures (Open Graph tags, `h1`, `<title>`, the largest paragraph block,
/// the meta description, and finally the visible body text).
pub struct GenericStrategy;

impl ExtractionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn source(&self) -> JobSource {
        JobSource::Generic
    }

    fn matches(&self, _url: &Url) -> bool {
        true
    }

    fn extract(&self, page: &Html) -> Extraction {
        let heuristic = Extraction {
            title: meta_content(page, "og:title").or_else(|| first_text(page, &["h1", "title"])),
            company: meta_content(page, "og:site_name"),
            location: None,
            description: largest_text_block(page)
                .or_else(|| meta_content(page, "og:description"))
                .or_else(|| meta_content(page, "description"))
                .or_else(|| body_text(page))
                .map(|d| truncate_at_word(&d, MAX_GENERIC_DESCRIPTION_CHARS)),
        };

        match json_ld_posting(page) {
            Some(structured) => {
                debug!("Found JSON-LD JobPosting");
                structured.or(heuristic)
            }
            None => heuristic,
        }
    }
}

/// Reads the first schema.org `JobPosting` object from the page's JSON-LD scripts.
fn json_ld_posting(page: &Html) -> Option<Extraction> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    page.select(&selector).find_map(|script| {
        let raw: String = script.text().collect();
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        find_job_posting(&value).map(extraction_from_json_ld)
    })
}

fn find_job_posting(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(map) => {
            let is_posting = match map.get("@type") {
                Some(Value::String(t)) => t == "JobPosting",
                Some(Value::Array(types)) => types.iter().any(|t| t == "JobPosting"),
                _ => false,
            };
            if is_posting {
                Some(value)
            } else {
                map.get("@graph").and_then(find_job_posting)
            }
        }
        _ => None,
    }
}

fn extraction_from_json_ld(posting: &Value) -> Extraction {
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let company = match posting.get("hiringOrganization") {
        Some(Value::String(name)) => Some(name.trim().to_string()),
        Some(org) => text(org.get("name")),
        None => None,
    };

    let location = posting.get("jobLocation").and_then(|loc| {
        let first = match loc {
            Value::Array(items) => items.first()?,
            other => other,
        };
        let address = first.get("address")?;
        let parts: Vec<String> = ["addressLocality", "addressRegion", "addressCountry"]
            .iter()
            .filter_map(|key| text(address.get(*key)))
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    });

    Extraction {
        title: text(posting.get("title")),
        company,
        location,
        description: text(posting.get("description"))
            .map(|html| fragment_to_text(&html))
            .filter(|d| !d.is_empty()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy table
// ────────────────────────────────────────────────────────────────────────────

pub struct StrategyTable {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new(vec![Box::new(LINKEDIN), Box::new(INDEED), Box::new(STEPSTONE)])
    }
}

impl StrategyTable {
    /// Site strategies in priority order; the generic fallback is appended last.
    pub fn new(mut sites: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        sites.push(Box::new(GenericStrategy));
        Self { strategies: sites }
    }

    /// The first strategy whose pattern matches the URL. Never fails: generic matches all.
    pub fn select(&self, url: &Url) -> &dyn ExtractionStrategy {
        self.strategies
            .iter()
            .find(|s| s.matches(url))
            .map(|s| s.as_ref())
            .unwrap_or_else(|| self.generic())
    }

    fn generic(&self) -> &dyn ExtractionStrategy {
        // `new` always pushes the generic strategy last.
        self.strategies[self.strategies.len() - 1].as_ref()
    }

    /// Turns a downloaded page into a posting. Falls back to the generic strategy
    /// when the site strategy returns no description, and fails with `Parse`
    /// rather than returning a posting without one.
    pub fn extract(&self, url: &Url, html: &str) -> Result<JobPosting, JobError> {
        let page = Html::parse_document(html);
        let strategy = self.select(url);
        let mut extraction = strategy.extract(&page);

        if !extraction.is_complete() && strategy.source() != JobSource::Generic {
            warn!(
                "{} strategy found no description for {url}, trying generic fallback",
                strategy.name()
            );
            extraction = extraction.or(self.generic().extract(&page));
        }

        if !extraction.is_complete() {
            let reason = if has_login_form(&page) {
                "the page requires signing in"
            } else {
                "no job description found on the page"
            };
            return Err(JobError::Parse {
                url: url.to_string(),
                reason: reason.to_string(),
            });
        }

        info!(
            "Extracted job posting from {url} via {} strategy",
            strategy.name()
        );

        JobPosting::scraped(
            extraction.title,
            extraction.company,
            extraction.location,
            extraction.description.unwrap_or_default(),
            url.as_str(),
            strategy.source(),
        )
        .ok_or_else(|| JobError::Parse {
            url: url.to_string(),
            reason: "no job description found on the page".to_string(),
        })
    }
}
