//! Parent-chunk context expansion for answer generation

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::text::token_count;
use crate::types::{Chunk, ScoredCandidate};

pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 1500;

/// Why a passage is in the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageSource {
    /// Section chunk surrounding a retrieved paragraph
    Parent,
    Retrieved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPassage {
    pub chunk_id: String,
    pub document_id: String,
    pub section_label: String,
    pub text: String,
    pub source: PassageSource,
}

impl ContextPassage {
    pub fn citation(&self) -> String {
        format!("{}, {}", self.document_id, self.section_label)
    }
}

/// Interleave retrieved chunks with their parent sections under a token budget.
///
/// Each parent is emitted at most once, before the first retrieved chunk that
/// references it. Passages that would exceed the budget are skipped.
pub fn expand_with_parents(
    ranked: &[ScoredCandidate],
    chunks_by_id: &HashMap<String, Chunk>,
    max_context_tokens: usize,
) -> Vec<ContextPassage> {
    let mut passages = Vec::new();
    let mut seen_parents: HashSet<&str> = HashSet::new();
    let mut used = 0;

    for candidate in ranked {
        if let Some(parent_id) = candidate.parent_chunk_id.as_deref() {
            if !seen_parents.contains(parent_id) {
                if let Some(parent) = chunks_by_id.get(parent_id) {
                    let tokens = token_count(&parent.text);
                    if used + tokens <= max_context_tokens {
                        passages.push(ContextPassage {
                            chunk_id: parent.chunk_id.clone(),
                            document_id: parent.document_id.clone(),
                            section_label: parent.section_label.clone(),
                            text: parent.text.clone(),
                            source: PassageSource::Parent,
                        });
                        seen_parents.insert(parent_id);
                        used += tokens;
                    }
                }
            }
        }

        let tokens = token_count(&candidate.text);
        if used + tokens <= max_context_tokens {
            passages.push(ContextPassage {
                chunk_id: candidate.chunk_id.clone(),
                document_id: candidate.document_id.clone(),
                section_label: candidate.section_label.clone(),
                text: candidate.text.clone(),
                source: PassageSource::Retrieved,
            });
            used += tokens;
        }
    }

    passages
}
