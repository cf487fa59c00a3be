//! Query reformulation
//!
//! Produces alternative phrasings of a query: acronym expansion, a
//! statement-like form of questions, and method/result synonyms. The
//! original query is always the first variant.

use once_cell::sync::Lazy;
use regex::Regex;

/// Acronyms spelled out when they appear as whole words in a query
pub const DEFAULT_ACRONYMS: &[(&str, &str)] = &[
    ("ML", "machine learning"),
    ("DL", "deep learning"),
    ("NLP", "natural language processing"),
    ("CV", "computer vision"),
    ("RL", "reinforcement learning"),
    ("CNN", "convolutional neural network"),
    ("RNN", "recurrent neural network"),
    ("LSTM", "long short-term memory"),
    ("GAN", "generative adversarial network"),
    ("LLM", "large language model"),
    ("RAG", "retrieval augmented generation"),
    ("QA", "question answering"),
    ("NER", "named entity recognition"),
    ("PCA", "principal component analysis"),
    ("SVM", "support vector machine"),
    ("API", "application programming interface"),
    ("GPU", "graphics processing unit"),
    ("CPU", "central processing unit"),
];

/// `(term, replacements)` pairs; each replacement yields one variant
const SYNONYMS: &[(&str, &[&str])] = &[
    ("method", &["methodology", "approach"]),
    ("result", &["finding", "outcome"]),
];

static INTERROGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:what|how|why|when|where|which|who)\s+(?:(?:is|are|was|were|did|do|does)\b)?\s*")
        .expect("valid regex")
});

static SYNONYM_PATTERNS: Lazy<Vec<(Regex, &'static [&'static str])>> = Lazy::new(|| {
    SYNONYMS
        .iter()
        .map(|(term, replacements)| {
            let pattern = Regex::new(&format!("(?i){}", regex::escape(term))).expect("valid regex");
            (pattern, *replacements)
        })
        .collect()
});

#[derive(Debug, Clone)]
struct Acronym {
    pattern: Regex,
    expansion: String,
}

/// Generates query variants
#[derive(Debug, Clone)]
pub struct QueryExpander {
    acronyms: Vec<Acronym>,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::with_acronyms(DEFAULT_ACRONYMS.iter().copied())
    }
}

impl QueryExpander {
    pub fn with_acronyms<'a, I>(acronyms: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let acronyms = acronyms
            .into_iter()
            .filter_map(|(acronym, expansion)| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(acronym))).ok()?;
                Some(Acronym {
                    pattern,
                    expansion: expansion.to_string(),
                })
            })
            .collect();
        Self { acronyms }
    }

    /// All variants of `query`, deduplicated, original first
    pub fn expand(&self, query: &str) -> Vec<String> {
        let mut variants = vec![query.to_string()];

        for acronym in &self.acronyms {
            if acronym.pattern.is_match(query) {
                let expanded = acronym
                    .pattern
                    .replace_all(query, acronym.expansion.as_str())
                    .into_owned();
                push_unique(&mut variants, expanded);
            }
        }

        if let Some(statement) = statement_form(query) {
            push_unique(&mut variants, statement);
        }

        for (pattern, replacements) in SYNONYM_PATTERNS.iter() {
            if !pattern.is_match(query) {
                continue;
            }
            for replacement in replacements.iter() {
                let substituted = pattern.replace_all(query, *replacement).into_owned();
                push_unique(&mut variants, substituted);
            }
        }

        variants
    }

    /// The first `max` variants of `query`
    pub fn expand_limited(&self, query: &str, max: usize) -> Vec<String> {
        let mut variants = self.expand(query);
        variants.truncate(max.max(1));
        variants
    }
}

/// "What methods did they use?" becomes "methods did they use"
fn statement_form(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    if !INTERROGATIVE.is_match(&lower) {
        return None;
    }
    let stripped = INTERROGATIVE.replace(&lower, "");
    let stripped = stripped.trim_end().trim_end_matches('?').trim();
    if stripped.is_empty() || stripped == lower {
        return None;
    }
    Some(stripped.to_string())
}

fn push_unique(variants: &mut Vec<String>, candidate: String) {
    if !candidate.trim().is_empty() && !variants.contains(&candidate) {
        variants.push(candidate);
    }
}
