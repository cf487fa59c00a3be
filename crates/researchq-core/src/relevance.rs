//! Structural relevance: which sections a query is likely about, and how
//! confident a ranking is overall.

use std::collections::BTreeSet;

use crate::config::RelevanceConfig;
use crate::domain::DomainProfile;
use crate::types::ScoredCandidate;

/// Keyword to likely-section table, matched as lower-cased substrings
pub const QUESTION_SECTION_MAP: &[(&str, &[&str])] = &[
    ("method", &["Methods", "Methods Summary", "Methodology"]),
    ("approach", &["Methods", "Methods Summary"]),
    ("technique", &["Methods", "Methods Summary"]),
    ("algorithm", &["Methods", "Methods Summary"]),
    ("how did", &["Methods", "Methods Summary"]),
    ("procedure", &["Methods", "Methods Summary"]),
    ("result", &["Results", "Results and Discussion", "Key Findings"]),
    ("finding", &["Results", "Results and Discussion", "Key Findings"]),
    ("performance", &["Results", "Results and Discussion"]),
    ("accuracy", &["Results", "Results and Discussion"]),
    ("outcome", &["Results", "Results and Discussion", "Key Findings"]),
    ("limitation", &["Limitations", "Discussion"]),
    ("weakness", &["Limitations", "Discussion"]),
    ("drawback", &["Limitations", "Discussion"]),
    ("future", &["Future Work", "Conclusion", "Discussion"]),
    ("next step", &["Future Work", "Conclusion"]),
    ("background", &["Introduction", "Background", "Related Work"]),
    ("motivation", &["Introduction", "Background"]),
    ("prior work", &["Related Work", "Background"]),
    ("related", &["Related Work", "Background"]),
    ("conclusion", &["Conclusion", "Discussion", "Key Findings"]),
    ("summary", &["Conclusion", "Abstract"]),
    ("main point", &["Conclusion", "Abstract"]),
    ("what is", &["Abstract", "Introduction"]),
    ("overview", &["Abstract", "Introduction"]),
    ("about", &["Abstract", "Introduction"]),
];

/// Maps query keywords to section labels
#[derive(Debug, Clone)]
pub struct SectionRelevanceDetector {
    table: Vec<(String, Vec<String>)>,
}

impl Default for SectionRelevanceDetector {
    fn default() -> Self {
        Self {
            table: QUESTION_SECTION_MAP
                .iter()
                .map(|(keyword, sections)| {
                    (
                        keyword.to_string(),
                        sections.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl SectionRelevanceDetector {
    /// Default table extended with the profile's keywords
    pub fn for_domain(profile: &DomainProfile) -> Self {
        let mut detector = Self::default();
        let mut table = profile.section_keywords.clone();
        table.append(&mut detector.table);
        detector.table = table;
        detector
    }

    /// Union of the sections of every keyword found in `query`.
    /// An empty set means "no boost", not "no results".
    pub fn detect(&self, query: &str) -> BTreeSet<String> {
        let query = query.to_lowercase();
        self.table
            .iter()
            .filter(|(keyword, _)| query.contains(keyword.as_str()))
            .flat_map(|(_, sections)| sections.iter().cloned())
            .collect()
    }
}

/// Caller-level reading of a ranking's best score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelevanceVerdict {
    /// The ranking was empty
    NoCandidates,
    /// Best score below the reject threshold; ask the user to rephrase
    Reject { best: f32 },
    /// Usable, but flag the answer as low confidence
    LowConfidence { best: f32 },
    Confident { best: f32 },
}

impl RelevanceVerdict {
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            RelevanceVerdict::LowConfidence { .. } | RelevanceVerdict::Confident { .. }
        )
    }
}

/// Thresholds applied on top of ranker output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevancePolicy {
    pub reject_below: f32,
    pub low_confidence_below: f32,
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self::from(&RelevanceConfig::default())
    }
}

impl From<&RelevanceConfig> for RelevancePolicy {
    fn from(config: &RelevanceConfig) -> Self {
        Self {
            reject_below: config.reject_below,
            low_confidence_below: config.low_confidence_below,
        }
    }
}

impl RelevancePolicy {
    pub fn assess(&self, ranked: &[ScoredCandidate]) -> RelevanceVerdict {
        let Some(best) = ranked
            .iter()
            .map(|c| c.final_score)
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))))
        else {
            return RelevanceVerdict::NoCandidates;
        };

        if best < self.reject_below {
            RelevanceVerdict::Reject { best }
        } else if best < self.low_confidence_below {
            RelevanceVerdict::LowConfidence { best }
        } else {
            RelevanceVerdict::Confident { best }
        }
    }
}
