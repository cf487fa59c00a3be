//! Section header detection
//!
//! Header rules are plain ordered data: `(pattern, label)` pairs compiled
//! once. Patterns are matched case-insensitively against a single trimmed
//! line and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SearchError, SearchResult};

/// Label given to text before the first detected header
pub const PREAMBLE: &str = "Preamble";

/// Lines longer than this are never headers
const MAX_HEADER_CHARS: usize = 100;

/// Minimum share of alphabetic characters in a header line
const MIN_ALPHA_RATIO: f32 = 0.5;

/// Default rule table for scholarly documents.
///
/// An optional trailing colon is accepted on every header.
pub const DEFAULT_SECTION_PATTERNS: &[(&str, &str)] = &[
    // Bare section names
    (r"^abstract$", "Abstract"),
    (r"^introduction$", "Introduction"),
    (r"^background$", "Background"),
    (r"^related\s+work$", "Related Work"),
    (r"^literature\s+review$", "Literature Review"),
    (r"^methods?$", "Methods"),
    (r"^methodology$", "Methods"),
    (r"^materials?\s+and\s+methods?$", "Methods"),
    (r"^experimental\s+(?:setup|design|methods?)$", "Methods"),
    (r"^results?$", "Results"),
    (r"^findings?$", "Results"),
    (r"^results?\s+and\s+discussion$", "Results and Discussion"),
    (r"^discussion$", "Discussion"),
    (r"^analysis$", "Analysis"),
    (r"^conclusions?$", "Conclusion"),
    (r"^summary$", "Conclusion"),
    (r"^limitations?$", "Limitations"),
    (r"^future\s+work$", "Future Work"),
    (r"^acknowledge?ments?$", "Acknowledgements"),
    (r"^references?$", "References"),
    (r"^bibliography$", "References"),
    (r"^appendix(?:\s+[a-z0-9]+)?(?:[:.\s].*)?$", "Appendix"),
    // Numbered sections ("1. Introduction", "2 Methods")
    (r"^\d+\.?\s*introduction$", "Introduction"),
    (r"^\d+\.?\s*background$", "Background"),
    (r"^\d+\.?\s*related\s+work$", "Related Work"),
    (r"^\d+\.?\s*(?:methods?|methodology)$", "Methods"),
    (r"^\d+\.?\s*results?$", "Results"),
    (r"^\d+\.?\s*discussion$", "Discussion"),
    (r"^\d+\.?\s*conclusions?$", "Conclusion"),
    (r"^\d+\.?\s*limitations?$", "Limitations"),
    (r"^\d+\.?\s*future\s+work$", "Future Work"),
    // Roman numeral sections ("II. Methods")
    (r"^[ivx]+\.?\s+introduction$", "Introduction"),
    (r"^[ivx]+\.?\s+background$", "Background"),
    (r"^[ivx]+\.?\s+related\s+work$", "Related Work"),
    (r"^[ivx]+\.?\s+(?:methods?|methodology)$", "Methods"),
    (r"^[ivx]+\.?\s+results?$", "Results"),
    (r"^[ivx]+\.?\s+discussion$", "Discussion"),
    (r"^[ivx]+\.?\s+conclusions?$", "Conclusion"),
];

static DEFAULT_RULES: Lazy<Vec<SectionRule>> = Lazy::new(|| {
    DEFAULT_SECTION_PATTERNS
        .iter()
        .map(|(pattern, label)| {
            SectionRule::new(pattern, label).expect("default section patterns are valid")
        })
        .collect()
});

/// One `(pattern, label)` header rule
#[derive(Debug, Clone)]
pub struct SectionRule {
    pattern: Regex,
    label: String,
}

impl SectionRule {
    /// Compile a rule. The pattern is made case-insensitive and tolerant of a
    /// trailing colon.
    pub fn new(pattern: &str, label: &str) -> SearchResult<Self> {
        let body = pattern.trim_end_matches('$');
        let anchored_end = body.len() != pattern.len();
        let source = if anchored_end {
            format!("(?i){body}:?$")
        } else {
            format!("(?i){body}")
        };
        let pattern = Regex::new(&source)
            .map_err(|e| SearchError::Config(format!("invalid section pattern {source:?}: {e}")))?;
        Ok(Self {
            pattern,
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Maps a single line to a canonical section label
#[derive(Debug, Clone)]
pub struct SectionClassifier {
    rules: Vec<SectionRule>,
}

impl Default for SectionClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl SectionClassifier {
    /// Use `rules` instead of the default table
    pub fn with_rules(rules: Vec<SectionRule>) -> Self {
        Self { rules }
    }

    /// Check `extra` before the current rules
    pub fn with_extra_rules(mut self, extra: Vec<SectionRule>) -> Self {
        let mut rules = extra;
        rules.append(&mut self.rules);
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[SectionRule] {
        &self.rules
    }

    /// Label for `line` if it looks like a section header
    pub fn classify(&self, line: &str) -> Option<&str> {
        let line = line.trim();
        if line.is_empty() || line.chars().count() > MAX_HEADER_CHARS {
            return None;
        }

        let total = line.chars().count();
        let alphabetic = line.chars().filter(|c| c.is_alphabetic()).count();
        if (alphabetic as f32) / (total as f32) < MIN_ALPHA_RATIO {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(line))
            .map(|rule| rule.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_and_caps_headers() {
        let classifier = SectionClassifier::default();
        assert_eq!(classifier.classify("Methods"), Some("Methods"));
        assert_eq!(classifier.classify("  RESULTS  "), Some("Results"));
        assert_eq!(classifier.classify("Materials and Methods"), Some("Methods"));
        assert_eq!(classifier.classify("Acknowledgments"), Some("Acknowledgements"));
        assert_eq!(classifier.classify("Bibliography"), Some("References"));
    }

    #[test]
    fn test_numbered_and_roman_headers() {
        let classifier = SectionClassifier::default();
        assert_eq!(classifier.classify("2. Methods"), Some("Methods"));
        assert_eq!(classifier.classify("3 Results"), Some("Results"));
        assert_eq!(classifier.classify("II. Methods"), Some("Methods"));
        assert_eq!(classifier.classify("IV Discussion"), Some("Discussion"));
    }

    #[test]
    fn test_trailing_colon_accepted() {
        let classifier = SectionClassifier::default();
        assert_eq!(classifier.classify("Abstract:"), Some("Abstract"));
        assert_eq!(classifier.classify("Appendix A: Survey items"), Some("Appendix"));
    }

    #[test]
    fn test_rejects_body_text() {
        let classifier = SectionClassifier::default();
        assert_eq!(classifier.classify("Methods were applied to all samples."), None);
        assert_eq!(classifier.classify(""), None);
        assert_eq!(classifier.classify("12345 67.8 %%"), None);
        let long = format!("Results {}", "x".repeat(120));
        assert_eq!(classifier.classify(&long), None);
    }

    #[test]
    fn test_extra_rules_take_precedence() {
        let extra = vec![SectionRule::new(r"^summary$", "Executive Summary").unwrap()];
        let classifier = SectionClassifier::default().with_extra_rules(extra);
        assert_eq!(classifier.classify("Summary"), Some("Executive Summary"));
        assert_eq!(classifier.classify("Methods"), Some("Methods"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = SectionRule::new(r"^(unclosed$", "Broken").unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }
}
