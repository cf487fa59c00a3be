//! Domain profiles
//!
//! A profile bundles the tables that differ between document families:
//! extra header rules, skipped sections, abbreviations, relevance keywords,
//! and the synthetic chunks to build.

use crate::error::SearchResult;
use crate::section::{SectionClassifier, SectionRule};
use crate::text::SentenceSplitter;

/// Sections never emitted as chunks in the research profile
pub const DEFAULT_SKIP_SECTIONS: &[&str] =
    &["References", "Bibliography", "Acknowledgements", "Appendix"];

/// A thematic chunk assembled from the first chunks of several sections
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRule {
    /// Label of the emitted chunk (e.g. "Key Findings")
    pub label: String,
    /// Source section labels, in the order they are concatenated
    pub sources: Vec<String>,
    /// Chunks taken from each source section
    pub chunks_per_section: usize,
    /// Character bound of the emitted text
    pub max_chars: usize,
}

impl SyntheticRule {
    fn new(label: &str, sources: &[&str], chunks_per_section: usize, max_chars: usize) -> Self {
        Self {
            label: label.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            chunks_per_section,
            max_chars,
        }
    }
}

/// Tables specific to one family of documents
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProfile {
    pub name: String,
    /// `(pattern, label)` rules checked before the default header rules
    pub extra_section_rules: Vec<(String, String)>,
    pub skip_sections: Vec<String>,
    pub extra_abbreviations: Vec<String>,
    /// `(keyword, sections)` pairs checked before the default relevance table
    pub section_keywords: Vec<(String, Vec<String>)>,
    pub max_chunk_tokens: usize,
    pub min_section_tokens: usize,
    pub synthetic_rules: Vec<SyntheticRule>,
}

impl Default for DomainProfile {
    fn default() -> Self {
        Self::research()
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rules(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(p, l)| (p.to_string(), l.to_string()))
        .collect()
}

fn keywords(items: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    items
        .iter()
        .map(|(k, sections)| (k.to_string(), owned(sections)))
        .collect()
}

impl DomainProfile {
    /// Scholarly papers
    pub fn research() -> Self {
        Self {
            name: "research".to_string(),
            extra_section_rules: Vec::new(),
            skip_sections: owned(DEFAULT_SKIP_SECTIONS),
            extra_abbreviations: Vec::new(),
            section_keywords: Vec::new(),
            max_chunk_tokens: 400,
            min_section_tokens: 20,
            synthetic_rules: vec![
                SyntheticRule::new(
                    "Key Findings",
                    &["Results", "Results and Discussion", "Conclusion", "Discussion"],
                    2,
                    2000,
                ),
                SyntheticRule::new("Methods Summary", &["Methods"], 2, 1500),
            ],
        }
    }

    /// Court opinions and briefs
    pub fn legal() -> Self {
        Self {
            name: "legal".to_string(),
            extra_section_rules: rules(&[
                (r"^(?:statement\s+of\s+(?:the\s+)?)?facts$", "Facts"),
                (r"^background\s+facts$", "Facts"),
                (r"^procedural\s+(?:history|background|posture)$", "Procedural History"),
                (r"^(?:questions?\s+presented|issues?(?:\s+presented)?)$", "Issues"),
                (r"^holdings?$", "Holding"),
                (r"^(?:reasoning|legal\s+analysis|analysis)$", "Reasoning"),
                (r"^(?:opinion(?:\s+of\s+the\s+court)?|majority\s+opinion)$", "Opinion"),
                (r"^concurr(?:ence|ing(?:\s+opinion)?)$", "Concurrence"),
                (r"^dissent(?:ing(?:\s+opinion)?)?$", "Dissent"),
                (r"^table\s+of\s+authorities$", "References"),
            ]),
            skip_sections: owned(&["References", "Table of Contents", "Appendix"]),
            extra_abbreviations: owned(&[
                "v", "u.s", "u.s.c", "f.2d", "f.3d", "f.4th", "supp", "cir", "ct", "app",
                "id", "ibid", "sec", "stat", "ann",
            ]),
            section_keywords: keywords(&[
                ("holding", &["Holding"]),
                ("held", &["Holding", "Opinion"]),
                ("dissent", &["Dissent"]),
                ("concur", &["Concurrence"]),
                ("facts", &["Facts"]),
                ("procedural", &["Procedural History"]),
                ("ruling", &["Holding", "Opinion"]),
                ("decide", &["Holding", "Opinion"]),
                ("reasoning", &["Reasoning", "Opinion"]),
                ("issue", &["Issues"]),
            ]),
            max_chunk_tokens: 500,
            min_section_tokens: 20,
            synthetic_rules: vec![SyntheticRule::new(
                "Court Holding",
                &["Holding", "Opinion"],
                2,
                2000,
            )],
        }
    }

    /// Clinical studies and case reports
    pub fn medical() -> Self {
        let mut skip = owned(DEFAULT_SKIP_SECTIONS);
        skip.push("Conflicts of Interest".to_string());
        Self {
            name: "medical".to_string(),
            extra_section_rules: rules(&[
                (r"^inclusion\s+criteria$", "Inclusion Criteria"),
                (r"^exclusion\s+criteria$", "Exclusion Criteria"),
                (r"^patients?\s+and\s+methods?$", "Methods"),
                (r"^study\s+(?:design|population)$", "Study Design"),
                (r"^(?:adverse\s+events?|safety)$", "Adverse Events"),
                (r"^case\s+(?:presentation|report|description)$", "Case Presentation"),
                (r"^clinical\s+(?:implications|significance)$", "Clinical Implications"),
                (r"^(?:conflicts?\s+of\s+interest|disclosures?)$", "Conflicts of Interest"),
            ]),
            skip_sections: skip,
            extra_abbreviations: owned(&["mg", "ml", "kg", "pt", "pts", "approx", "dx", "tx", "hx"]),
            section_keywords: keywords(&[
                ("eligib", &["Inclusion Criteria", "Exclusion Criteria", "Methods"]),
                ("inclusion", &["Inclusion Criteria", "Methods"]),
                ("exclusion", &["Exclusion Criteria", "Methods"]),
                ("side effect", &["Adverse Events", "Results"]),
                ("adverse", &["Adverse Events", "Results"]),
                ("safety", &["Adverse Events", "Results"]),
                ("dosage", &["Methods", "Results"]),
                ("dose", &["Methods", "Results"]),
                ("patient", &["Study Design", "Methods", "Case Presentation"]),
                ("clinical", &["Clinical Implications", "Discussion"]),
            ]),
            max_chunk_tokens: 400,
            min_section_tokens: 20,
            synthetic_rules: vec![
                SyntheticRule::new(
                    "Key Findings",
                    &["Results", "Conclusion", "Discussion"],
                    2,
                    2000,
                ),
                SyntheticRule::new(
                    "Methods Summary",
                    &["Methods", "Study Design", "Inclusion Criteria"],
                    2,
                    1500,
                ),
            ],
        }
    }

    /// Resolve a profile by configuration name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "research" => Some(Self::research()),
            "legal" => Some(Self::legal()),
            "medical" => Some(Self::medical()),
            _ => None,
        }
    }

    /// Header classifier with this profile's rules checked first
    pub fn classifier(&self) -> SearchResult<SectionClassifier> {
        let extra = self
            .extra_section_rules
            .iter()
            .map(|(pattern, label)| SectionRule::new(pattern, label))
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(SectionClassifier::default().with_extra_rules(extra))
    }

    pub fn splitter(&self) -> SentenceSplitter {
        SentenceSplitter::with_abbreviations(&self.extra_abbreviations)
    }

    pub fn is_skipped(&self, label: &str) -> bool {
        self.skip_sections.iter().any(|s| s.eq_ignore_ascii_case(label))
    }
}
