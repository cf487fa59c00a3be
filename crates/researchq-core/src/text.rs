//! Text utilities for extracted document text
//!
//! Cleaning, abbreviation-aware sentence splitting, and the word-level token
//! count used throughout the crate. All truncation is done on character
//! boundaries so multi-byte text never panics.

use once_cell::sync::Lazy;
use regex::Regex;

/// Abbreviations whose trailing period never ends a sentence
pub const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "sr", "jr",
    "vs", "etc", "al", "fig", "figs", "eq", "eqs",
    "vol", "vols", "no", "nos", "pp", "p",
    "inc", "corp", "ltd", "co",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    "i.e", "e.g", "cf", "viz", "approx",
];

// Private-use code points stand in for protected periods while splitting.
const PERIOD_MARK: char = '\u{E000}';
const DECIMAL_MARK: char = '\u{E001}';
const ELLIPSIS_MARK: char = '\u{E002}';

static PAGE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"===\s*PAGE BREAK\s*===").expect("valid regex"));
static PAGE_NUMBER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:page\s+)?\d+\s*$").expect("valid regex"));
static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-[ \t]*\n\s*(\w)").expect("valid regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)\.(\d)").expect("valid regex"));
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3}").expect("valid regex"));

static DEFAULT_SPLITTER: Lazy<SentenceSplitter> = Lazy::new(SentenceSplitter::default);

/// Word-level token count (whitespace separated)
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep at most `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Normalize raw page text before section detection.
///
/// Removes page-break markers, standalone page numbers and short non-word
/// artifact lines, collapses horizontal whitespace, and re-joins words that
/// were hyphenated across a line break.
pub fn clean_text(text: &str) -> String {
    let text = PAGE_BREAK.replace_all(text, "\n\n");

    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !PAGE_NUMBER_LINE.is_match(line))
        .filter(|line| {
            let stripped = line.trim();
            stripped.chars().count() >= 5
                || stripped.chars().next().is_some_and(|c| c.is_alphabetic())
        })
        .collect();
    let text = kept.join("\n");

    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = HYPHEN_BREAK.replace_all(&text, "${1}${2}");

    text.trim().to_string()
}

/// Split text into sentences using the default abbreviation table
pub fn split_sentences(text: &str) -> Vec<String> {
    DEFAULT_SPLITTER.split(text)
}

/// Sentence splitter that protects abbreviations, decimals and ellipses
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    abbreviations: Regex,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::with_abbreviations(std::iter::empty::<&str>())
    }
}

impl SentenceSplitter {
    /// Build a splitter protecting the default abbreviations plus `extra`
    pub fn with_abbreviations<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect();
        for word in extra {
            let word = word.as_ref().trim().trim_end_matches('.').to_lowercase();
            if !word.is_empty() && !words.contains(&word) {
                words.push(word);
            }
        }
        // Longer alternatives first so "figs" is not cut short by "fig".
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)\b({alternation})\.");
        let abbreviations = Regex::new(&pattern).expect("escaped abbreviation pattern is valid");

        Self { abbreviations }
    }

    /// Split `text` into trimmed, non-empty sentences
    pub fn split(&self, text: &str) -> Vec<String> {
        let protected = self
            .abbreviations
            .replace_all(text, format!("${{1}}{PERIOD_MARK}").as_str())
            .into_owned();
        let protected = DECIMAL
            .replace_all(&protected, format!("${{1}}{DECIMAL_MARK}${{2}}").as_str())
            .into_owned();
        let protected = ELLIPSIS
            .replace_all(&protected, ELLIPSIS_MARK.to_string().as_str())
            .into_owned();

        split_at_boundaries(&protected)
            .into_iter()
            .map(restore_marks)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A boundary follows `.`, `!` or `?` when the next non-space text is a line
/// break, or when whitespace is followed by an uppercase letter or a quote.
fn split_at_boundaries(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = idx + c.len_utf8();
        let rest = &text[end..];

        let horizontal = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let after_horizontal = &rest[horizontal..];

        let is_boundary = if after_horizontal.starts_with(['\n', '\r']) {
            true
        } else {
            let ws = rest.len() - rest.trim_start().len();
            ws > 0
                && rest[ws..]
                    .chars()
                    .next()
                    .is_some_and(|next| next.is_uppercase() || next == '"' || next == '\'')
        };

        if is_boundary {
            sentences.push(&text[start..end]);
            let ws = rest.len() - rest.trim_start().len();
            start = end + ws;
            while iter.peek().is_some_and(|(i, _)| *i < start) {
                iter.next();
            }
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn restore_marks(sentence: &str) -> String {
    let mut out = String::with_capacity(sentence.len());
    for c in sentence.chars() {
        match c {
            PERIOD_MARK | DECIMAL_MARK => out.push('.'),
            ELLIPSIS_MARK => out.push_str("..."),
            other => out.push(other),
        }
    }
    out
}
