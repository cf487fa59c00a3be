//! Common types shared by the chunker, the vector store, and the ranker

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Granularity of a chunk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Bounded summary of a whole section
    Section,
    /// Sentence-packed window inside a section
    Paragraph,
    /// Aggregate of several chunks under a thematic label
    Synthetic,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Section => "section",
            ChunkType::Paragraph => "paragraph",
            ChunkType::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citeable text segment produced by the chunker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier for this chunk
    pub chunk_id: String,
    /// Identifier of the source document
    pub document_id: String,
    /// The text content of this chunk
    pub text: String,
    /// Canonical section label (or thematic label for synthetic chunks)
    pub section_label: String,
    pub chunk_type: ChunkType,
    /// Whitespace-token count of `text`
    pub token_count: usize,
    /// Section chunk this paragraph belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    /// Position of this chunk in the chunker's output
    pub sequence_index: usize,
}

impl Chunk {
    /// Metadata stored next to this chunk's vector
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            document_id: self.document_id.clone(),
            section: self.section_label.clone(),
            chunk_type: self.chunk_type,
            text: self.text.clone(),
            parent_chunk_id: self.parent_chunk_id.clone(),
            token_count: Some(self.token_count),
            sequence_index: Some(self.sequence_index),
        }
    }
}

/// Fixed metadata record kept alongside every stored vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub section: String,
    pub chunk_type: ChunkType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<usize>,
}

impl ChunkMetadata {
    /// Reject records that cannot be cited back to a document and section
    pub fn validate(&self) -> SearchResult<()> {
        if self.document_id.trim().is_empty() {
            return Err(SearchError::InvalidMetadata("document_id is empty".to_string()));
        }
        if self.section.trim().is_empty() {
            return Err(SearchError::InvalidMetadata("section is empty".to_string()));
        }
        if self.text.trim().is_empty() {
            return Err(SearchError::InvalidMetadata("text is empty".to_string()));
        }
        if self.chunk_type == ChunkType::Paragraph {
            if let Some(parent) = &self.parent_chunk_id {
                if parent.trim().is_empty() {
                    return Err(SearchError::InvalidMetadata(
                        "parent_chunk_id is empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A vector ready to be written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One match returned by a vector store query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// Restricts queries and deletions to a subset of stored vectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl MetadataFilter {
    pub fn document(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
        }
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match &self.document_id {
            Some(id) => metadata.document_id == *id,
            None => true,
        }
    }
}

/// A ranked chunk handed to answer generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub section_label: String,
    pub chunk_type: ChunkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub section_boost: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    pub final_score: f32,
}

impl ScoredCandidate {
    /// Citation marker in the form `document_id, section`
    pub fn citation(&self) -> String {
        format!("{}, {}", self.document_id, self.section_label)
    }
}

/// Ranker output, best first
pub type RankedList = Vec<ScoredCandidate>;

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChunkMetadata {
        ChunkMetadata {
            document_id: "paper-1".to_string(),
            section: "Methods".to_string(),
            chunk_type: ChunkType::Paragraph,
            text: "We recruited 120 participants.".to_string(),
            parent_chunk_id: Some("paper-1_methods".to_string()),
            token_count: Some(4),
            sequence_index: Some(2),
        }
    }

    #[test]
    fn test_chunk_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChunkType::Synthetic).unwrap();
        assert_eq!(json, "\"synthetic\"");
        assert_eq!(ChunkType::Paragraph.to_string(), "paragraph");
    }

    #[test]
    fn test_metadata_validation() {
        assert!(metadata().validate().is_ok());

        let mut missing_doc = metadata();
        missing_doc.document_id = "  ".to_string();
        assert!(matches!(
            missing_doc.validate(),
            Err(SearchError::InvalidMetadata(_))
        ));

        let mut empty_text = metadata();
        empty_text.text.clear();
        assert!(empty_text.validate().is_err());
    }

    #[test]
    fn test_metadata_optional_fields_default() {
        let json = r#"{"document_id":"d","section":"Results","chunk_type":"section","text":"t"}"#;
        let parsed: ChunkMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.parent_chunk_id, None);
        assert_eq!(parsed.token_count, None);
        assert_eq!(parsed.chunk_type, ChunkType::Section);
    }

    #[test]
    fn test_filter_matches_document() {
        let filter = MetadataFilter::document("paper-1");
        assert!(filter.matches(&metadata()));
        assert!(!MetadataFilter::document("paper-2").matches(&metadata()));
        assert!(MetadataFilter::default().matches(&metadata()));
    }
}
