//! Retrieval configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SearchError, SearchResult};

/// Main retrieval configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Embedding API configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Hybrid ranking weights and limits
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Embedding cache bounds
    #[serde(default)]
    pub cache: CacheConfig,

    /// Low-relevance thresholds
    #[serde(default)]
    pub relevance: RelevanceConfig,

    /// Cross-encoder reranker
    #[serde(default)]
    pub reranker: RerankerConfig,
}

/// Embedding API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API key (can also use EMBEDDING_API_KEY or OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Expected embedding dimensions; the client re-detects from responses
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> SearchResult<String> {
        self.resolve_api_key(|name| std::env::var(name).ok())
    }

    /// Get API key from config, falling back to variables looked up with `var`
    pub fn resolve_api_key<F>(&self, var: F) -> SearchResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        var("EMBEDDING_API_KEY")
            .filter(|key| !key.is_empty())
            .or_else(|| var("OPENAI_API_KEY"))
            .filter(|key| !key.is_empty())
            .ok_or(SearchError::ApiKeyMissing)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_batch_size() -> usize {
    64
}

fn default_embedding_timeout() -> u64 {
    60
}

/// How section text is cut into retrievable chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Section summary chunk plus sentence-packed children
    #[default]
    Hierarchical,
    /// Blank-line paragraphs merged up to the token ceiling
    Paragraph,
    /// Paragraphs, then sentences, then words until each piece fits
    Recursive,
    /// Overlapping sentence windows without section chunks
    Sentence,
}

/// Document chunking configuration.
///
/// Token limits left unset fall back to the domain profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: ChunkStrategy,

    /// Token ceiling of a paragraph chunk
    #[serde(default)]
    pub max_chunk_tokens: Option<usize>,

    /// Sentences carried into the next paragraph chunk
    #[serde(default = "default_overlap_sentences")]
    pub overlap_sentences: usize,

    /// Sections with fewer tokens are skipped
    #[serde(default)]
    pub min_section_tokens: Option<usize>,

    /// Paragraph and recursive pieces below this are merged or dropped
    #[serde(default = "default_min_chunk_tokens")]
    pub min_chunk_tokens: usize,

    /// Character bound of section-level chunks
    #[serde(default = "default_section_summary_chars")]
    pub section_summary_chars: usize,

    /// Emit synthetic cross-section chunks
    #[serde(default = "default_add_synthetic")]
    pub add_synthetic: bool,

    /// Domain profile name ("research", "legal", "medical")
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            max_chunk_tokens: None,
            overlap_sentences: default_overlap_sentences(),
            min_section_tokens: None,
            min_chunk_tokens: default_min_chunk_tokens(),
            section_summary_chars: default_section_summary_chars(),
            add_synthetic: default_add_synthetic(),
            domain: default_domain(),
        }
    }
}

fn default_overlap_sentences() -> usize {
    3
}

fn default_min_chunk_tokens() -> usize {
    50
}

fn default_section_summary_chars() -> usize {
    2000
}

fn default_add_synthetic() -> bool {
    true
}

fn default_domain() -> String {
    "research".to_string()
}

/// Hybrid ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Candidates fetched per variant, as a multiple of `top_k`
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Query variants searched per request
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_boost")]
    pub default_boost: f32,

    /// Candidates sent to the reranker
    #[serde(default = "default_rerank_window")]
    pub rerank_window: usize,

    /// Share of the reranker score in the reranked final score
    #[serde(default = "default_rerank_weight")]
    pub rerank_weight: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            candidate_multiplier: default_candidate_multiplier(),
            max_variants: default_max_variants(),
            default_top_k: default_top_k(),
            default_boost: default_boost(),
            rerank_window: default_rerank_window(),
            rerank_weight: default_rerank_weight(),
        }
    }
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_max_variants() -> usize {
    3
}

fn default_top_k() -> usize {
    10
}

fn default_boost() -> f32 {
    2.0
}

fn default_rerank_window() -> usize {
    20
}

fn default_rerank_weight() -> f32 {
    0.7
}

/// Embedding cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    3600
}

/// Thresholds applied to the best final score of a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceConfig {
    #[serde(default = "default_reject_below")]
    pub reject_below: f32,

    #[serde(default = "default_low_confidence_below")]
    pub low_confidence_below: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            reject_below: default_reject_below(),
            low_confidence_below: default_low_confidence_below(),
        }
    }
}

fn default_reject_below() -> f32 {
    0.25
}

fn default_low_confidence_below() -> f32 {
    0.4
}

/// Reranker API configuration. Reranking is disabled without `api_base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: default_rerank_model(),
            timeout_secs: default_rerank_timeout(),
        }
    }
}

impl RerankerConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_base.as_deref().is_some_and(|base| !base.trim().is_empty())
    }
}

fn default_rerank_model() -> String {
    "rerank-english-v3.0".to_string()
}

fn default_rerank_timeout() -> u64 {
    30
}

impl RetrievalConfig {
    /// Load configuration from file and environment
    /// Priority: environment variables > config.toml > defaults
    pub fn load() -> SearchResult<Self> {
        let path = Self::toml_config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without applying environment overrides
    pub fn from_file(path: &Path) -> SearchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SearchResult<Self> {
        let config: RetrievalConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Override fields from environment-style variables.
    /// New naming takes precedence over legacy naming.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(api_base) = non_empty("EMBEDDING_API_BASE").or_else(|| non_empty("OPENAI_API_BASE")) {
            self.embedding.api_base = api_base;
        }
        if let Some(api_key) = non_empty("EMBEDDING_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.embedding.api_key = Some(api_key);
        }
        if let Some(model) = non_empty("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(base) = non_empty("RERANK_API_BASE") {
            self.reranker.api_base = Some(base);
        }
        if let Some(key) = non_empty("RERANK_API_KEY") {
            self.reranker.api_key = Some(key);
        }
        if let Some(domain) = non_empty("RESEARCHQ_DOMAIN") {
            self.chunking.domain = domain;
        }
    }

    /// Reject settings the chunker and ranker cannot work with
    pub fn validate(&self) -> SearchResult<()> {
        let weights = [
            ("ranking.semantic_weight", self.ranking.semantic_weight),
            ("ranking.keyword_weight", self.ranking.keyword_weight),
            ("ranking.rerank_weight", self.ranking.rerank_weight),
        ];
        for (name, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(SearchError::Config(format!(
                    "{name} must be within [0, 1], got {weight}"
                )));
            }
        }
        if self.chunking.max_chunk_tokens == Some(0) {
            return Err(SearchError::Config(
                "chunking.max_chunk_tokens must be positive".to_string(),
            ));
        }
        if self.relevance.reject_below > self.relevance.low_confidence_below {
            return Err(SearchError::Config(format!(
                "relevance.reject_below ({}) exceeds relevance.low_confidence_below ({})",
                self.relevance.reject_below, self.relevance.low_confidence_below
            )));
        }
        if self.cache.max_entries == 0 {
            return Err(SearchError::Config(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get base config directory
    fn config_dir() -> PathBuf {
        if let Ok(root) = std::env::var("RESEARCHQ_ROOT") {
            return PathBuf::from(root);
        }

        dirs::home_dir()
            .map(|h| h.join(".researchq"))
            .unwrap_or_else(|| PathBuf::from(".researchq"))
    }

    /// Get config file path (config.toml)
    pub fn toml_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
