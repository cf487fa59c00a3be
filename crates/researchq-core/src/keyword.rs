//! BM25-style keyword score without corpus statistics

use std::collections::{HashMap, HashSet};

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Assumed average chunk length in tokens
const AVG_DOC_LEN: f32 = 400.0;
/// Constant weight standing in for inverse document frequency
const TERM_WEIGHT: f32 = 1.5;
const SCALE: f32 = 3.0;

/// Keyword relevance of `text` to `query`, in `[0, 1]`.
///
/// Terms are lower-cased whitespace tokens. A query or text with no terms,
/// or with no term in common, scores exactly 0.
pub fn compute_keyword_score(query: &str, text: &str) -> f32 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();

    let query_terms: HashSet<&str> = query.split_whitespace().collect();
    if query_terms.is_empty() {
        return 0.0;
    }

    let mut term_freq: HashMap<&str, usize> = HashMap::new();
    let mut doc_len = 0usize;
    for term in text.split_whitespace() {
        *term_freq.entry(term).or_insert(0) += 1;
        doc_len += 1;
    }
    if doc_len == 0 {
        return 0.0;
    }

    let norm = (1.0 - B) + B * (doc_len as f32 / AVG_DOC_LEN);
    let mut score = 0.0f32;
    let mut matched = 0usize;

    for term in &query_terms {
        if let Some(&tf) = term_freq.get(term) {
            let tf = tf as f32;
            score += tf * (K1 + 1.0) / (tf + K1 * norm) * TERM_WEIGHT;
            matched += 1;
        }
    }
    if matched == 0 {
        return 0.0;
    }

    let distinct = query_terms.len() as f32;
    let coverage = matched as f32 / distinct;
    let normalized = (score / distinct) * (0.7 + 0.3 * coverage);
    (normalized / SCALE).clamp(0.0, 1.0)
}
