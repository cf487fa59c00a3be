//! Structure-aware document chunking
//!
//! Text is cleaned and split into labeled sections at detected header lines.
//! The default hierarchical strategy emits each section twice: once as a
//! bounded section chunk and once as sentence-packed paragraph chunks that
//! point back to it. Paragraph, recursive and sentence strategies emit only
//! the finer chunks. Synthetic chunks are assembled last from the first
//! chunks of designated sections.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::config::{ChunkStrategy, ChunkingConfig};
use crate::domain::{DomainProfile, SyntheticRule};
use crate::error::{SearchError, SearchResult};
use crate::section::{SectionClassifier, PREAMBLE};
use crate::text::{clean_text, token_count, truncate_chars, SentenceSplitter};
use crate::types::{Chunk, ChunkType};

/// Longest prefix considered for an inline `Header: text` line
const MAX_INLINE_HEADER_CHARS: usize = 40;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// A labeled span of cleaned document text
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub label: String,
    pub text: String,
}

/// Splits documents into section, paragraph and synthetic chunks
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    profile: DomainProfile,
    classifier: SectionClassifier,
    splitter: SentenceSplitter,
    strategy: ChunkStrategy,
    max_chunk_tokens: usize,
    overlap_sentences: usize,
    min_section_tokens: usize,
    min_chunk_tokens: usize,
    section_summary_chars: usize,
    add_synthetic: bool,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::with_profile(&DomainProfile::research(), &ChunkingConfig::default())
    }
}

impl DocumentChunker {
    /// Build a chunker for the domain named in `config`
    pub fn new(config: &ChunkingConfig) -> SearchResult<Self> {
        let profile = DomainProfile::by_name(&config.domain)
            .ok_or_else(|| SearchError::Config(format!("unknown domain: {}", config.domain)))?;
        let classifier = profile.classifier()?;
        Ok(Self::build(profile, classifier, config))
    }

    /// Build a chunker from an explicit profile.
    ///
    /// Profile header rules that fail to compile are ignored; use
    /// [`DocumentChunker::new`] to surface them.
    pub fn with_profile(profile: &DomainProfile, config: &ChunkingConfig) -> Self {
        let classifier = profile.classifier().unwrap_or_else(|e| {
            log::warn!("Ignoring {} section rules: {}", profile.name, e);
            SectionClassifier::default()
        });
        Self::build(profile.clone(), classifier, config)
    }

    fn build(profile: DomainProfile, classifier: SectionClassifier, config: &ChunkingConfig) -> Self {
        Self {
            classifier,
            splitter: profile.splitter(),
            strategy: config.strategy,
            max_chunk_tokens: config
                .max_chunk_tokens
                .unwrap_or(profile.max_chunk_tokens)
                .max(1),
            overlap_sentences: config.overlap_sentences,
            min_section_tokens: config.min_section_tokens.unwrap_or(profile.min_section_tokens),
            min_chunk_tokens: config.min_chunk_tokens,
            section_summary_chars: config.section_summary_chars,
            add_synthetic: config.add_synthetic,
            profile,
        }
    }

    /// Replace the header classifier
    pub fn with_classifier(mut self, classifier: SectionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Chunk a document. Never fails: unusable input yields fewer or no chunks.
    pub fn chunk(&self, document_text: &str, document_id: &str) -> Vec<Chunk> {
        let cleaned = clean_text(document_text);
        let sections = self.split_sections(&cleaned);
        log::debug!("{}: detected {} sections", document_id, sections.len());

        let hierarchical = self.strategy == ChunkStrategy::Hierarchical;
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut seen_ids: HashMap<String, usize> = HashMap::new();

        for section in &sections {
            if self.profile.is_skipped(&section.label) {
                continue;
            }
            if hierarchical && token_count(&section.text) < self.min_section_tokens {
                continue;
            }

            let pieces = self.split_section(&section.text);
            if pieces.is_empty() && !hierarchical {
                continue;
            }

            let section_id = unique_id(
                format!("{}_{}", document_id, slug(&section.label)),
                &mut seen_ids,
            );

            let parent = if hierarchical {
                let summary = truncate_chars(&section.text, self.section_summary_chars);
                push_chunk(
                    &mut chunks,
                    section_id.clone(),
                    document_id,
                    summary.trim().to_string(),
                    &section.label,
                    ChunkType::Section,
                    None,
                );
                Some(section_id.clone())
            } else {
                None
            };

            for (n, text) in pieces.into_iter().enumerate() {
                push_chunk(
                    &mut chunks,
                    format!("{}_chunk_{}", section_id, n),
                    document_id,
                    text,
                    &section.label,
                    ChunkType::Paragraph,
                    parent.clone(),
                );
            }
        }

        if self.add_synthetic {
            for rule in &self.profile.synthetic_rules {
                if let Some(text) = synthesize(&chunks, rule) {
                    let id = unique_id(
                        format!("{}_synthetic_{}", document_id, slug(&rule.label)),
                        &mut seen_ids,
                    );
                    push_chunk(
                        &mut chunks,
                        id,
                        document_id,
                        text,
                        &rule.label,
                        ChunkType::Synthetic,
                        None,
                    );
                }
            }
        }

        log::debug!(
            "{}: emitted {} chunks ({:?})",
            document_id,
            chunks.len(),
            self.strategy
        );
        chunks
    }

    /// Split cleaned text into sections at header lines.
    ///
    /// Text before the first header is labeled [`PREAMBLE`]. Sections with no
    /// content are dropped.
    pub fn split_sections(&self, text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut label = PREAMBLE.to_string();
        let mut buffer: Vec<&str> = Vec::new();

        for line in text.lines() {
            let (header, rest) = match self.classifier.classify(line) {
                Some(found) => (Some(found.to_string()), None),
                None => match self.inline_header(line) {
                    Some((found, rest)) => (Some(found), Some(rest)),
                    None => (None, None),
                },
            };

            match header {
                Some(next_label) => {
                    flush_section(&mut sections, &label, &buffer);
                    buffer.clear();
                    label = next_label;
                    if let Some(rest) = rest {
                        buffer.push(rest);
                    }
                }
                None => buffer.push(line),
            }
        }
        flush_section(&mut sections, &label, &buffer);

        sections
    }

    /// `Methods: We recruited ...` style lines carry their header inline
    fn inline_header<'a>(&self, line: &'a str) -> Option<(String, &'a str)> {
        let trimmed = line.trim_start();
        let colon = trimmed.find(':')?;
        let (prefix, rest) = trimmed.split_at(colon);
        if prefix.chars().count() > MAX_INLINE_HEADER_CHARS {
            return None;
        }
        let rest = rest[1..].trim();
        if rest.is_empty() {
            return None;
        }
        let label = self.classifier.classify(prefix)?;
        Some((label.to_string(), rest))
    }

    fn split_section(&self, text: &str) -> Vec<String> {
        match self.strategy {
            ChunkStrategy::Hierarchical | ChunkStrategy::Sentence => {
                self.pack_sentences(text, self.overlap_sentences)
            }
            ChunkStrategy::Paragraph => self.pack_paragraphs(text),
            ChunkStrategy::Recursive => self.split_recursive(text),
        }
    }

    /// Greedy sentence packing with `overlap` sentences carried between chunks
    fn pack_sentences(&self, text: &str, overlap: usize) -> Vec<String> {
        let sentences = self.splitter.split(text);
        let mut packed = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for sentence in &sentences {
            let tokens = token_count(sentence);
            if !current.is_empty() && current_tokens + tokens > self.max_chunk_tokens {
                packed.push(current.join(" "));

                if overlap > 0 && current.len() > overlap {
                    current.drain(..current.len() - overlap);
                } else {
                    current.clear();
                }
                current_tokens = current.iter().map(|s| token_count(s)).sum();
            }
            current.push(sentence);
            current_tokens += tokens;
        }

        if !current.is_empty() {
            packed.push(current.join(" "));
        }
        packed
    }

    /// Merge blank-line paragraphs up to the ceiling.
    ///
    /// An oversized paragraph is packed by sentences on its own. A trailing
    /// group under `min_chunk_tokens` is dropped.
    fn pack_paragraphs(&self, text: &str) -> Vec<String> {
        let mut packed = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for paragraph in paragraphs(text) {
            let tokens = token_count(paragraph);
            if tokens > self.max_chunk_tokens {
                if !current.is_empty() {
                    packed.push(current.join("\n\n"));
                    current.clear();
                    current_tokens = 0;
                }
                packed.extend(self.pack_sentences(paragraph, 0));
                continue;
            }
            if !current.is_empty() && current_tokens + tokens > self.max_chunk_tokens {
                packed.push(current.join("\n\n"));
                current.clear();
                current_tokens = 0;
            }
            current.push(paragraph);
            current_tokens += tokens;
        }

        if current_tokens >= self.min_chunk_tokens && !current.is_empty() {
            packed.push(current.join("\n\n"));
        }
        packed
    }

    /// Descend paragraphs, then sentences, then words until every piece fits,
    /// then fold pieces under `min_chunk_tokens` into their predecessor.
    fn split_recursive(&self, text: &str) -> Vec<String> {
        let max = self.max_chunk_tokens;
        let mut pieces: Vec<String> = Vec::new();

        for paragraph in paragraphs(text) {
            if token_count(paragraph) <= max {
                pieces.push(paragraph.to_string());
                continue;
            }

            let sentences = self.splitter.split(paragraph);
            let mut group: Vec<&str> = Vec::new();
            let mut group_tokens = 0;
            for sentence in &sentences {
                let tokens = token_count(sentence);
                if tokens > max {
                    if !group.is_empty() {
                        pieces.push(group.join(" "));
                        group.clear();
                        group_tokens = 0;
                    }
                    let words: Vec<&str> = sentence.split_whitespace().collect();
                    pieces.extend(words.chunks(max).map(|w| w.join(" ")));
                } else if group_tokens + tokens <= max {
                    group.push(sentence);
                    group_tokens += tokens;
                } else {
                    if !group.is_empty() {
                        pieces.push(group.join(" "));
                    }
                    group = vec![sentence.as_str()];
                    group_tokens = tokens;
                }
            }
            if !group.is_empty() {
                pieces.push(group.join(" "));
            }
        }

        merge_small(pieces, self.min_chunk_tokens)
    }
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

fn merge_small(pieces: Vec<String>, min_tokens: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for piece in pieces {
        match merged.last_mut() {
            Some(last) if token_count(last) < min_tokens || token_count(&piece) < min_tokens => {
                last.push_str("\n\n");
                last.push_str(&piece);
            }
            _ => merged.push(piece),
        }
    }
    merged
}

fn flush_section(sections: &mut Vec<Section>, label: &str, buffer: &[&str]) {
    let text = buffer.join("\n").trim().to_string();
    if !text.is_empty() {
        sections.push(Section {
            label: label.to_string(),
            text,
        });
    }
}

fn push_chunk(
    chunks: &mut Vec<Chunk>,
    chunk_id: String,
    document_id: &str,
    text: String,
    section_label: &str,
    chunk_type: ChunkType,
    parent_chunk_id: Option<String>,
) {
    let sequence_index = chunks.len();
    chunks.push(Chunk {
        chunk_id,
        document_id: document_id.to_string(),
        token_count: token_count(&text),
        text,
        section_label: section_label.to_string(),
        chunk_type,
        parent_chunk_id,
        sequence_index,
    });
}

/// First chunks of each source section, concatenated and bounded
fn synthesize(chunks: &[Chunk], rule: &SyntheticRule) -> Option<String> {
    let parts: Vec<&str> = rule
        .sources
        .iter()
        .flat_map(move |source| {
            chunks
                .iter()
                .filter(move |c| c.chunk_type != ChunkType::Synthetic && c.section_label == *source)
                .take(rule.chunks_per_section)
                .map(|c| c.text.as_str())
        })
        .collect();

    if parts.is_empty() {
        return None;
    }
    let text = truncate_chars(&parts.join("\n\n"), rule.max_chars);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn unique_id(base: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}_{}", base, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    fn paper() -> String {
        format!(
            "Abstract\n{}.\n\nMethods\nWe recruited 120 participants from two clinics. {}.\n\n\
             Results\nAccuracy was 85% on the held-out set. {}.\n\nReferences\n[1] Smith J. A study. 2020.\n[2] Doe A. Another study. 2021.",
            words(30, "summary"),
            words(40, "procedure"),
            words(40, "outcome"),
        )
    }

    #[test]
    fn test_sections_split_at_headers() {
        let chunker = DocumentChunker::default();
        let sections = chunker.split_sections(&clean_text(&paper()));
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Abstract", "Methods", "Results", "References"]);
    }

    #[test]
    fn test_preamble_without_headers() {
        let chunker = DocumentChunker::default();
        let text = format!("{}. {}.", words(15, "alpha"), words(15, "beta"));
        let chunks = chunker.chunk(&text, "doc");
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.section_label == PREAMBLE));
    }

    #[test]
    fn test_inline_headers() {
        let chunker = DocumentChunker::default();
        let sections = chunker.split_sections("Methods: We recruited 120 participants.\nResults: It worked.");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].label, "Methods");
        assert_eq!(sections[0].text, "We recruited 120 participants.");
        assert_eq!(sections[1].label, "Results");
    }

    #[test]
    fn test_skips_references_and_short_sections() {
        let chunker = DocumentChunker::default();
        let text = format!("{}\n\nDiscussion\nToo short to keep.", paper());
        let chunks = chunker.chunk(&text, "doc");

        assert!(chunks.iter().all(|c| c.section_label != "References"));
        assert!(chunks.iter().all(|c| c.section_label != "Discussion"));
    }

    #[test]
    fn test_paragraphs_reference_section_chunk() {
        let chunker = DocumentChunker::default();
        let chunks = chunker.chunk(&paper(), "doc");

        let methods_sections: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.section_label == "Methods" && c.chunk_type == ChunkType::Section)
            .collect();
        assert_eq!(methods_sections.len(), 1);
        assert_eq!(methods_sections[0].chunk_id, "doc_methods");

        for paragraph in chunks.iter().filter(|c| c.chunk_type == ChunkType::Paragraph) {
            let parent_id = paragraph.parent_chunk_id.as_deref().unwrap();
            let parent = chunks.iter().find(|c| c.chunk_id == parent_id).unwrap();
            assert_eq!(parent.chunk_type, ChunkType::Section);
            assert_eq!(parent.section_label, paragraph.section_label);
        }
    }

    #[test]
    fn test_synthetic_chunks() {
        let chunker = DocumentChunker::default();
        let chunks = chunker.chunk(&paper(), "doc");

        let findings = chunks
            .iter()
            .find(|c| c.section_label == "Key Findings")
            .unwrap();
        assert_eq!(findings.chunk_type, ChunkType::Synthetic);
        assert_eq!(findings.chunk_id, "doc_synthetic_key_findings");
        assert!(findings.text.contains("Accuracy was 85%"));
        assert!(findings.text.chars().count() <= 2000);

        let methods = chunks
            .iter()
            .find(|c| c.section_label == "Methods Summary")
            .unwrap();
        assert!(methods.text.contains("120 participants"));
    }

    #[test]
    fn test_synthetic_disabled() {
        let config = ChunkingConfig {
            add_synthetic: false,
            ..Default::default()
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let chunks = chunker.chunk(&paper(), "doc");
        assert!(chunks.iter().all(|c| c.chunk_type != ChunkType::Synthetic));
    }

    #[test]
    fn test_sequence_and_token_counts() {
        let chunks = DocumentChunker::default().chunk(&paper(), "doc");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
            assert_eq!(chunk.token_count, token_count(&chunk.text));
        }
    }

    #[test]
    fn test_overlap_between_paragraphs() {
        let config = ChunkingConfig {
            max_chunk_tokens: Some(10),
            overlap_sentences: 1,
            min_section_tokens: Some(1),
            ..Default::default()
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let text = "Results\nFirst finding was strong. Second finding was weak. \
                    Third finding was mixed. Fourth finding was null.";
        let paragraphs: Vec<Chunk> = chunker
            .chunk(text, "doc")
            .into_iter()
            .filter(|c| c.chunk_type == ChunkType::Paragraph)
            .collect();

        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].text, "First finding was strong. Second finding was weak.");
        assert_eq!(paragraphs[1].text, "Second finding was weak. Third finding was mixed.");
        assert_eq!(paragraphs[2].text, "Third finding was mixed. Fourth finding was null.");
    }

    #[test]
    fn test_no_overlap_when_chunk_too_small() {
        let config = ChunkingConfig {
            max_chunk_tokens: Some(4),
            overlap_sentences: 3,
            min_section_tokens: Some(1),
            ..Default::default()
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let paragraphs: Vec<Chunk> = chunker
            .chunk("Results\nOne two three four. Five six seven eight.", "doc")
            .into_iter()
            .filter(|c| c.chunk_type == ChunkType::Paragraph)
            .collect();

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].text, "Five six seven eight.");
    }

    fn strategy_config(strategy: ChunkStrategy, max_chunk_tokens: usize) -> ChunkingConfig {
        ChunkingConfig {
            strategy,
            max_chunk_tokens: Some(max_chunk_tokens),
            add_synthetic: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_hierarchical_is_default_strategy() {
        let chunker = DocumentChunker::default();
        assert_eq!(chunker.strategy(), ChunkStrategy::Hierarchical);
        let chunks = chunker.chunk(&paper(), "doc");
        assert!(chunks.iter().any(|c| c.chunk_type == ChunkType::Section));
    }

    #[test]
    fn test_sentence_strategy_windows_without_sections() {
        let config = ChunkingConfig {
            overlap_sentences: 1,
            ..strategy_config(ChunkStrategy::Sentence, 10)
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let text = "Results\nFirst finding was strong. Second finding was weak. \
                    Third finding was mixed. Fourth finding was null.";
        let chunks = chunker.chunk(text, "doc");

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Paragraph));
        assert!(chunks.iter().all(|c| c.parent_chunk_id.is_none()));
        assert_eq!(chunks[0].chunk_id, "doc_results_chunk_0");
        assert_eq!(chunks[1].text, "Second finding was weak. Third finding was mixed.");
    }

    #[test]
    fn test_paragraph_strategy_merges_and_drops_short_tail() {
        let config = ChunkingConfig {
            min_chunk_tokens: 12,
            ..strategy_config(ChunkStrategy::Paragraph, 20)
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let text = format!(
            "Results\n{}.\n\n{}.\n\n{}.\n\nThe tail is short.",
            words(8, "alpha"),
            words(8, "beta"),
            words(8, "gamma"),
        );
        let chunks = chunker.chunk(&text, "doc");

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text,
            format!("{}.\n\n{}.", words(8, "alpha"), words(8, "beta"))
        );
        assert!(chunks[0].parent_chunk_id.is_none());
    }

    #[test]
    fn test_recursive_strategy_splits_long_sentence_into_words() {
        let config = ChunkingConfig {
            min_chunk_tokens: 3,
            ..strategy_config(ChunkStrategy::Recursive, 5)
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let text = "Results\none two three four five six seven eight nine ten eleven twelve.\n\n\
                    Short fits here.";
        let texts: Vec<String> = chunker
            .chunk(text, "doc")
            .into_iter()
            .map(|c| c.text)
            .collect();

        assert_eq!(
            texts,
            vec![
                "one two three four five".to_string(),
                "six seven eight nine ten\n\neleven twelve.".to_string(),
                "Short fits here.".to_string(),
            ]
        );
    }

    #[test]
    fn test_repeated_labels_get_unique_ids() {
        let config = ChunkingConfig {
            min_section_tokens: Some(1),
            add_synthetic: false,
            ..Default::default()
        };
        let chunker = DocumentChunker::new(&config).unwrap();
        let chunks = chunker.chunk("Results\nFirst batch.\nDiscussion\nSome talk.\nResults\nSecond batch.", "doc");
        let ids: Vec<&str> = chunks
            .iter()
            .filter(|c| c.chunk_type == ChunkType::Section)
            .map(|c| c.chunk_id.as_str())
            .collect();
        assert_eq!(ids, vec!["doc_results", "doc_discussion", "doc_results_2"]);
    }

    #[test]
    fn test_unknown_domain_is_config_error() {
        let config = ChunkingConfig {
            domain: "astrology".to_string(),
            ..Default::default()
        };
        assert!(matches!(DocumentChunker::new(&config), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(DocumentChunker::default().chunk("", "doc").is_empty());
        assert!(DocumentChunker::default().chunk("\n\n  12 \n", "doc").is_empty());
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Results and Discussion"), "results_and_discussion");
        assert_eq!(slug("Key Findings"), "key_findings");
    }
}
