//! Candidate profile heuristics over raw CV text.
//!
//! Pure pattern matching, no model call. The profile only steers the cover
//! letter and pitch prompts; the full CV text is always sent alongside it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const HEADLINE_SCAN_LINES: usize = 6;
const MAX_SKILL_LINES: usize = 3;
const MAX_SKILLS_CHARS: usize = 400;
const MAX_ACHIEVEMENT_LINES: usize = 2;
const MAX_ACHIEVEMENTS_CHARS: usize = 500;

static CAPITALISED_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Lu}\p{Ll}+").expect("static name regex"));

static TITLE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(engineer|developer|scientist|manager|analyst|designer|architect|consultant|specialist)\b",
    )
    .expect("static title regex")
});

static SKILL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(python|java|javascript|typescript|react|sql|aws|docker|kubernetes|tensorflow|pytorch|django|flask|spring|rust)\b|c\+\+|node\.js",
    )
    .expect("static skill regex")
});

static ACHIEVEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s*%|\b(increased|reduced|improved|led|delivered|built|achieved|designed)\b")
        .expect("static achievement regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateProfile {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub skills: Option<String>,
    pub achievements: Option<String>,
}

impl CandidateProfile {
    pub fn from_cv(cv_text: &str) -> Self {
        let lines: Vec<&str> = cv_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let Some(first) = lines.first() else {
            return Self::default();
        };

        let word_count = first.split_whitespace().count();
        let name = ((1..=4).contains(&word_count) && CAPITALISED_WORD.is_match(first))
            .then(|| first.to_string());

        let headline = lines
            .iter()
            .take(HEADLINE_SCAN_LINES)
            .find(|l| TITLE_KEYWORD.is_match(l))
            .map(|l| l.to_string());

        Self {
            name,
            headline,
            skills: join_matching(&lines, &SKILL_KEYWORD, MAX_SKILL_LINES, MAX_SKILLS_CHARS),
            achievements: join_matching(
                &lines,
                &ACHIEVEMENT,
                MAX_ACHIEVEMENT_LINES,
                MAX_ACHIEVEMENTS_CHARS,
            ),
        }
    }
}

fn join_matching(lines: &[&str], pattern: &Regex, max_lines: usize, max_chars: usize) -> Option<String> {
    let picked: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| pattern.is_match(l))
        .take(max_lines)
        .collect();
    (!picked.is_empty()).then(|| picked.join("; ").chars().take(max_chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "Jane Smith
        Senior Software Engineer

        Experience:
        - 6 years building scalable backend systems with Python and FastAPI
        - Led team of 5 developers on microservices architecture project
        - Reduced API latency by 45% through caching and optimization
        - Skills: Python, FastAPI, PostgreSQL, Redis, Docker, Kubernetes, AWS";

    #[test]
    fn test_profile_from_typical_cv() {
        let profile = CandidateProfile::from_cv(CV);
        assert_eq!(profile.name.as_deref(), Some("Jane Smith"));
        assert_eq!(profile.headline.as_deref(), Some("Senior Software Engineer"));

        let skills = profile.skills.unwrap();
        assert!(skills.starts_with("- 6 years building"));
        assert!(skills.contains("Docker"));

        let achievements = profile.achievements.unwrap();
        assert!(achievements.contains("Led team of 5"));
        assert!(achievements.contains("45%"));
    }

    #[test]
    fn test_long_first_line_is_not_a_name() {
        let profile = CandidateProfile::from_cv("Curriculum vitae of a data analyst in Berlin\nSQL");
        assert_eq!(profile.name, None);
        assert_eq!(
            profile.headline.as_deref(),
            Some("Curriculum vitae of a data analyst in Berlin")
        );
    }

    #[test]
    fn test_empty_cv_gives_empty_profile() {
        assert_eq!(CandidateProfile::from_cv("  \n "), CandidateProfile::default());
    }

    #[test]
    fn test_skill_matching_respects_word_boundaries() {
        let profile = CandidateProfile::from_cv("Max Mustermann\nJavaScript and Node.js\nJavanese cooking");
        assert_eq!(profile.skills.as_deref(), Some("JavaScript and Node.js"));
    }
}
