//! ResearchQ retrieval core
//!
//! Structure-aware chunking and hybrid ranking for document question answering.
//!
//! ## Features
//!
//! - Section-aware chunking at section, paragraph and synthetic granularity
//! - Domain profiles for research, legal and medical documents
//! - Hybrid ranking (semantic + BM25-style keyword + section boost)
//! - Query expansion and optional cross-encoder reranking
//! - Bounded LRU + TTL embedding cache
//! - OpenAI-compatible embedding and rerank clients (feature `http`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use researchq_core::{HybridRanker, RankOptions, RetrievalConfig};
//!
//! let config = RetrievalConfig::load()?;
//! let ranker = HybridRanker::from_config(&config, embedder, store)?;
//! let ranked = ranker
//!     .rank(&RankOptions::new("What methods did they use?").top_k(5))
//!     .await?;
//! for hit in &ranked {
//!     println!("[{}] {:.3}", hit.citation(), hit.final_score);
//! }
//! ```

mod cache;
mod chunker;
mod config;
mod context;
mod domain;
mod embedding;
mod error;
mod evaluation;
mod expansion;
mod indexer;
mod keyword;
mod ranker;
mod relevance;
mod reranker;
mod section;
mod text;
mod types;
mod vector_store;


pub use cache::{cache_key, CacheStats, EmbeddingCache};
pub use chunker::{DocumentChunker, Section};
pub use config::{
    CacheConfig, ChunkStrategy, ChunkingConfig, EmbeddingConfig, RankingConfig, RelevanceConfig,
    RerankerConfig, RetrievalConfig,
};
pub use context::{expand_with_parents, ContextPassage, PassageSource, DEFAULT_MAX_CONTEXT_TOKENS};
pub use domain::{DomainProfile, SyntheticRule, DEFAULT_SKIP_SECTIONS};
pub use embedding::EmbeddingProvider;
#[cfg(feature = "http")]
pub use embedding::OpenAiEmbeddingClient;
pub use error::{RetrievalError, RetrievalStage, SearchError, SearchResult};
pub use evaluation::{evaluate, EvaluationReport, EvaluationRun, DEFAULT_K_VALUES};
pub use expansion::{QueryExpander, DEFAULT_ACRONYMS};
pub use indexer::{IndexProgress, IndexStats, Indexer};
pub use keyword::compute_keyword_score;
pub use ranker::{apply_rerank_scores, hybrid_score, sort_by_final_score, HybridRanker, RankOptions};
pub use relevance::{
    RelevancePolicy, RelevanceVerdict, SectionRelevanceDetector, QUESTION_SECTION_MAP,
};
pub use reranker::Reranker;
#[cfg(feature = "http")]
pub use reranker::HttpReranker;
pub use section::{SectionClassifier, SectionRule, DEFAULT_SECTION_PATTERNS, PREAMBLE};
pub use text::{clean_text, split_sentences, token_count, SentenceSplitter, DEFAULT_ABBREVIATIONS};
pub use types::*;
pub use vector_store::{cosine_similarity, InMemoryVectorStore, VectorStore};
