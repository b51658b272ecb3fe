//! Emphasized keywords: technology terms the job asks for that the candidate
//! actually has and the generated text surfaces.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical spellings, reported as written here.
const TECH_TERMS: &[&str] = &[
    "SQL", "Python", "Java", "JavaScript", "TypeScript", "Rust", "C++", "C#", "Scala", "React",
    "Angular", "Vue", "Node.js", "Django", "Flask", "FastAPI", "PostgreSQL", "MySQL",
    "MongoDB", "Redis", "Kafka", "Spark", "Hadoop", "Airflow", "dbt", "Snowflake", "Tableau",
    "Power BI", "Looker", "Excel", "Pandas", "NumPy", "scikit-learn", "TensorFlow", "PyTorch",
    "AWS", "Azure", "GCP", "Docker", "Kubernetes", "Terraform", "Linux", "Git", "GraphQL",
    "CI/CD", "Machine Learning", "Statistics",
];

static TERM_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TECH_TERMS
        .iter()
        .filter_map(|term| {
            // Terms like "C++" end in non-word characters, so \b cannot be used on the right.
            let pattern = format!(
                r"(?i)(?:^|[^\p{{L}}\p{{N}}_]){}(?:$|[^\p{{L}}\p{{N}}_+#])",
                regex::escape(term)
            );
            Regex::new(&pattern).ok().map(|re| (*term, re))
        })
        .collect()
});

/// Technology terms mentioned in `text`, in list order.
pub fn find_terms(text: &str) -> Vec<&'static str> {
    TERM_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(term, _)| *term)
        .collect()
}

/// Terms present in the job, in the CV, and in at least one generated artifact.
pub fn emphasized_keywords(job_text: &str, cv_text: &str, outputs: &[&str]) -> Vec<String> {
    find_terms(job_text)
        .into_iter()
        .filter(|term| contains_term(cv_text, term))
        .filter(|term| outputs.iter().any(|out| contains_term(out, term)))
        .map(String::from)
        .collect()
}

fn contains_term(text: &str, term: &str) -> bool {
    TERM_PATTERNS
        .iter()
        .find(|(t, _)| *t == term)
        .is_some_and(|(_, re)| re.is_match(text))
}
