//! Hybrid ranking
//!
//! A ranking call expands the query, searches the vector store once per
//! variant (concurrently), keeps the best semantic score per chunk, blends it
//! with a keyword score and a section boost, and optionally lets a
//! cross-encoder reorder the top slice.

use futures::future::join_all;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::cache::EmbeddingCache;
use crate::config::{RankingConfig, RetrievalConfig};
use crate::domain::DomainProfile;
use crate::embedding::EmbeddingProvider;
use crate::error::{RetrievalError, RetrievalStage, SearchError, SearchResult};
use crate::expansion::QueryExpander;
use crate::keyword::compute_keyword_score;
use crate::relevance::SectionRelevanceDetector;
use crate::reranker::Reranker;
use crate::types::{MetadataFilter, RankedList, ScoredCandidate, VectorMatch};
use crate::vector_store::VectorStore;

/// Ranking options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankOptions {
    /// The natural-language query
    pub query: String,
    /// Maximum number of results
    pub top_k: Option<usize>,
    /// Multiplier for candidates in a relevant section
    pub boost_factor: Option<f32>,
    /// Refine the top slice with the reranker
    pub use_rerank: Option<bool>,
    /// Restrict the search to one document
    pub document_id: Option<String>,
}

impl RankOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn boost_factor(mut self, boost_factor: f32) -> Self {
        self.boost_factor = Some(boost_factor);
        self
    }

    pub fn rerank(mut self, use_rerank: bool) -> Self {
        self.use_rerank = Some(use_rerank);
        self
    }

    pub fn document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }
}

/// Blend of semantic and keyword evidence, scaled by the section boost
pub fn hybrid_score(semantic: f32, keyword: f32, section_boost: f32, config: &RankingConfig) -> f32 {
    (config.semantic_weight * semantic + config.keyword_weight * keyword) * section_boost
}

/// Descending final score; ties by ascending chunk id
pub fn sort_by_final_score(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

/// Min-max normalize `raw` and fold it into the leading candidates.
///
/// When every raw score is equal the raw value is used unchanged.
pub fn apply_rerank_scores(candidates: &mut [ScoredCandidate], raw: &[f32], rerank_weight: f32) {
    let (min, max) = raw
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = max - min;

    for (candidate, &score) in candidates.iter_mut().zip(raw) {
        let normalized = if range > f32::EPSILON {
            (score - min) / range
        } else {
            score
        };
        candidate.rerank_score = Some(normalized);
        candidate.final_score =
            rerank_weight * normalized + (1.0 - rerank_weight) * candidate.final_score;
    }
}

/// Orchestrates expansion, retrieval, scoring and reranking
pub struct HybridRanker {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
    cache: Arc<EmbeddingCache>,
    expander: QueryExpander,
    detector: SectionRelevanceDetector,
    config: RankingConfig,
}

impl HybridRanker {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: RankingConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            reranker: None,
            cache: Arc::new(EmbeddingCache::default()),
            expander: QueryExpander::default(),
            detector: SectionRelevanceDetector::default(),
            config,
        }
    }

    /// Wire a ranker from a full configuration.
    ///
    /// The HTTP reranker is attached when one is configured.
    pub fn from_config(
        config: &RetrievalConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> SearchResult<Self> {
        config.validate()?;
        let profile = DomainProfile::by_name(&config.chunking.domain).ok_or_else(|| {
            SearchError::Config(format!("unknown domain: {}", config.chunking.domain))
        })?;

        #[allow(unused_mut)]
        let mut ranker = Self::new(embedder, store, config.ranking.clone())
            .with_cache(Arc::new(EmbeddingCache::new(&config.cache)))
            .with_detector(SectionRelevanceDetector::for_domain(&profile));

        #[cfg(feature = "http")]
        {
            if let Some(reranker) = crate::reranker::HttpReranker::from_config(&config.reranker)? {
                ranker = ranker.with_reranker(Arc::new(reranker));
            }
        }

        Ok(ranker)
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Share an embedding cache between rankers
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = expander;
        self
    }

    pub fn with_detector(mut self, detector: SectionRelevanceDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank indexed chunks for `options.query`, best first.
    ///
    /// An empty list means nothing matched. An error means the search could
    /// not run: every query variant failed to embed or to query the store.
    pub async fn rank(&self, options: &RankOptions) -> Result<RankedList, RetrievalError> {
        let query = options.query.trim();
        let top_k = options.top_k.unwrap_or(self.config.default_top_k);
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let boost_factor = options.boost_factor.unwrap_or(self.config.default_boost);
        let filter = options
            .document_id
            .as_deref()
            .map(MetadataFilter::document);

        let variants = self
            .expander
            .expand_limited(query, self.config.max_variants);
        log::debug!("Ranking with {} query variants: {:?}", variants.len(), variants);

        let fetch_k = top_k.saturating_mul(self.config.candidate_multiplier.max(1));
        let outcomes = join_all(
            variants
                .iter()
                .map(|variant| self.search_variant(variant, fetch_k, filter.as_ref())),
        )
        .await;

        let merged = merge_outcomes(&variants, outcomes)?;
        log::debug!("Merged {} candidates", merged.len());

        let relevant = self.detector.detect(query);
        let mut ranked: RankedList = merged
            .into_values()
            .map(|m| self.score(query, &relevant, boost_factor, m))
            .collect();
        sort_by_final_score(&mut ranked);

        if options.use_rerank.unwrap_or(false) && !ranked.is_empty() {
            self.rerank(query, &mut ranked).await;
        }

        ranked.truncate(top_k);
        Ok(ranked)
    }

    async fn search_variant(
        &self,
        variant: &str,
        fetch_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, RetrievalError> {
        let vector = self
            .cache
            .get_or_compute(variant, || self.embedder.embed(variant))
            .await
            .map_err(|e| RetrievalError::new(RetrievalStage::Embedding, e))?;
        if vector.is_empty() {
            return Ok(Vec::new());
        }

        self.store
            .query(&vector, fetch_k, filter)
            .await
            .map_err(|e| RetrievalError::new(RetrievalStage::VectorSearch, e))
    }

    fn score(
        &self,
        query: &str,
        relevant: &BTreeSet<String>,
        boost_factor: f32,
        m: VectorMatch,
    ) -> ScoredCandidate {
        let keyword_score = compute_keyword_score(query, &m.metadata.text);
        let section_boost = if relevant.contains(&m.metadata.section) {
            boost_factor
        } else {
            1.0
        };
        let final_score = hybrid_score(m.score, keyword_score, section_boost, &self.config);

        ScoredCandidate {
            chunk_id: m.id,
            document_id: m.metadata.document_id,
            text: m.metadata.text,
            section_label: m.metadata.section,
            chunk_type: m.metadata.chunk_type,
            parent_chunk_id: m.metadata.parent_chunk_id,
            semantic_score: m.score,
            keyword_score,
            section_boost,
            rerank_score: None,
            final_score,
        }
    }

    /// Best-effort: any reranker problem leaves the hybrid order in place
    async fn rerank(&self, query: &str, ranked: &mut RankedList) {
        let Some(reranker) = &self.reranker else {
            log::warn!("Rerank requested but no reranker is configured; keeping hybrid order");
            return;
        };

        let window = ranked.len().min(self.config.rerank_window.max(1));
        let texts: Vec<String> = ranked[..window].iter().map(|c| c.text.clone()).collect();

        match reranker.score_batch(query, &texts).await {
            Ok(scores) if scores.len() == window => {
                apply_rerank_scores(&mut ranked[..window], &scores, self.config.rerank_weight);
                sort_by_final_score(ranked);
            }
            Ok(scores) => {
                log::warn!(
                    "Reranker returned {} scores for {} candidates; keeping hybrid order",
                    scores.len(),
                    window
                );
            }
            Err(e) => {
                log::warn!("Reranker unavailable, keeping hybrid order: {}", e);
            }
        }
    }
}

/// Max-reduce matches across variants. Fails only when every variant failed.
fn merge_outcomes(
    variants: &[String],
    outcomes: Vec<Result<Vec<VectorMatch>, RetrievalError>>,
) -> Result<HashMap<String, VectorMatch>, RetrievalError> {
    let mut merged: HashMap<String, VectorMatch> = HashMap::new();
    let mut first_error = None;
    let mut succeeded = 0;

    for (variant, outcome) in variants.iter().zip(outcomes) {
        match outcome {
            Ok(matches) => {
                succeeded += 1;
                for m in matches {
                    let better = merged
                        .get(&m.id)
                        .map_or(true, |existing| m.score > existing.score);
                    if better {
                        merged.insert(m.id.clone(), m);
                    }
                }
            }
            Err(e) => {
                log::warn!("Query variant {:?} failed: {}", variant, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(merged),
    }
}
