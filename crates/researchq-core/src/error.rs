//! Error types for chunking, embedding, and retrieval

use thiserror::Error;

/// Errors raised by collaborators and configuration
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Rerank error: {0}")]
    Rerank(String),

    #[error("Invalid chunk metadata: {0}")]
    InvalidMetadata(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key not configured")]
    ApiKeyMissing,
}

pub type SearchResult<T> = Result<T, SearchError>;

impl SearchError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Unavailable(_) => true,
            SearchError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            #[cfg(feature = "http")]
            SearchError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Which external call a ranking request failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    Embedding,
    VectorSearch,
}

impl std::fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalStage::Embedding => f.write_str("query embedding"),
            RetrievalStage::VectorSearch => f.write_str("vector search"),
        }
    }
}

/// The ranker could not search at all.
///
/// Distinct from an empty result, which means nothing relevant was indexed.
#[derive(Debug, Error)]
#[error("retrieval failed during {stage}: {source}")]
pub struct RetrievalError {
    pub stage: RetrievalStage,
    #[source]
    pub source: SearchError,
}

impl RetrievalError {
    pub fn new(stage: RetrievalStage, source: SearchError) -> Self {
        Self { stage, source }
    }

    pub fn is_transient(&self) -> bool {
        self.source.is_transient()
    }
}
