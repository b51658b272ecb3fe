//! Reasoning-leak detection.
//!
//! Which delimiters a model emits for its hidden reasoning depends on the model
//! family and version, so the detector is built from a pattern list that can be
//! replaced through configuration. Stripping of well-formed blocks is fixed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Case-insensitive markers of visible reasoning.
pub const DEFAULT_MARKERS: &[&str] = &[
    r"<\s*/?\s*think\b",
    r"<\s*/?\s*reason(ing)?\b",
    r"\[(thinking|thought)\]",
    r"\blet me think\b",
    r"\bmy reasoning\b",
    r"\bchain of thought\b",
];

static REASONING_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<\s*(think|reasoning|reason)\s*>.*?<\s*/\s*(think|reasoning|reason)\s*>")
        .expect("static reasoning block regex")
});

static CLOSING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/\s*(think|reasoning|reason)\s*>").expect("static closing tag regex")
});

static STRAY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(think|reasoning|reason)\s*>|\[(thinking|thought)\]")
        .expect("static stray tag regex")
});

#[derive(Debug, Clone)]
pub struct ReasoningDetector {
    markers: Vec<Regex>,
}

impl Default for ReasoningDetector {
    fn default() -> Self {
        // The built-in list is known-good; fall back to an empty detector only if it is ever edited badly.
        Self::from_patterns(DEFAULT_MARKERS.iter().copied()).unwrap_or(Self {
            markers: Vec::new(),
        })
    }
}

impl ReasoningDetector {
    /// Builds a detector from regex patterns, matched case-insensitively.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = patterns
            .into_iter()
            .map(|p| Regex::new(&format!("(?i){}", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { markers })
    }

    /// Removes complete reasoning blocks and stray reasoning tags, then trims.
    ///
    /// A closing tag left without its opener ends reasoning that started at the
    /// top of the output, so everything up to it is dropped as well.
    pub fn strip(&self, text: &str) -> String {
        let without_blocks = REASONING_BLOCK.replace_all(text, "");
        let answer = match CLOSING_TAG.find_iter(&without_blocks).last() {
            Some(tag) => &without_blocks[tag.end()..],
            None => &without_blocks[..],
        };
        STRAY_TAG.replace_all(answer, "").trim().to_string()
    }

    /// The first marker text found in `text`, if any.
    pub fn detect(&self, text: &str) -> Option<String> {
        self.markers
            .iter()
            .find_map(|marker| marker.find(text))
            .map(|m| m.as_str().to_string())
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        assert_eq!(
            ReasoningDetector::default().marker_count(),
            DEFAULT_MARKERS.len()
        );
    }

    #[test]
    fn test_strip_removes_think_block() {
        let detector = ReasoningDetector::default();
        let raw = "<think>\nThe user wants a letter. I should...\n</think>\n\nDear Hiring Manager,";
        assert_eq!(detector.strip(raw), "Dear Hiring Manager,");
    }

    #[test]
    fn test_strip_removes_stray_tags() {
        let detector = ReasoningDetector::default();
        assert_eq!(detector.strip("[thinking] Hello <think>"), "Hello");
    }

    #[test]
    fn test_strip_drops_reasoning_before_unmatched_closing_tag() {
        let detector = ReasoningDetector::default();
        let raw = "Okay, the user wants a letter for Acme Corp. I should stress SQL.\n</think>\n\nDear Hiring Manager,";
        assert_eq!(detector.strip(raw), "Dear Hiring Manager,");
    }

    #[test]
    fn test_closing_tag_at_end_leaves_nothing() {
        let detector = ReasoningDetector::default();
        assert_eq!(detector.strip("thinking out loud </reasoning>"), "");
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        let detector = ReasoningDetector::default();
        assert_eq!(
            detector.detect("Okay. Let me think about the structure."),
            Some("Let me think".to_string())
        );
        assert!(detector.detect("I think this role fits me.").is_none());
    }

    #[test]
    fn test_unclosed_think_tag_is_detected_after_strip() {
        let detector = ReasoningDetector::default();
        let stripped = detector.strip("< think  reasoning without end");
        assert!(detector.detect(&stripped).is_some());
    }

    #[test]
    fn test_custom_patterns_replace_defaults() {
        let detector = ReasoningDetector::from_patterns(["<scratchpad>"]).unwrap();
        assert!(detector.detect("<scratchpad>notes").is_some());
        assert!(detector.detect("let me think").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(ReasoningDetector::from_patterns(["(unclosed"]).is_err());
    }
}
