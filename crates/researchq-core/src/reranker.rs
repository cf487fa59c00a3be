//! Cross-encoder reranker interface and an HTTP `/rerank` client

use async_trait::async_trait;

use crate::error::SearchResult;

/// Scores `(query, passage)` pairs jointly.
///
/// Output is one raw score per candidate, in input order. Stateless per call.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score_batch(&self, query: &str, candidates: &[String]) -> SearchResult<Vec<f32>>;
}

#[cfg(feature = "http")]
pub use client::HttpReranker;

#[cfg(feature = "http")]
mod client {
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    use super::Reranker;
    use crate::config::RerankerConfig;
    use crate::error::{SearchError, SearchResult};

    /// Client for Cohere/Jina-style rerank endpoints
    pub struct HttpReranker {
        url: String,
        api_key: Option<String>,
        model: String,
        client: Client,
    }

    #[derive(Debug, Serialize)]
    struct RerankRequest<'a> {
        model: &'a str,
        query: &'a str,
        documents: &'a [String],
    }

    #[derive(Debug, Deserialize)]
    struct RerankResponse {
        results: Vec<RerankResult>,
    }

    #[derive(Debug, Deserialize)]
    struct RerankResult {
        index: usize,
        relevance_score: f32,
    }

    impl HttpReranker {
        /// `None` when no reranker endpoint is configured
        pub fn from_config(config: &RerankerConfig) -> SearchResult<Option<Self>> {
            let Some(api_base) = config.api_base.as_deref().filter(|b| !b.trim().is_empty()) else {
                return Ok(None);
            };

            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;

            Ok(Some(Self {
                url: format!("{}/rerank", api_base.trim_end_matches('/')),
                api_key: config.api_key.clone().filter(|k| !k.is_empty()),
                model: config.model.clone(),
                client,
            }))
        }
    }

    #[async_trait]
    impl Reranker for HttpReranker {
        async fn score_batch(&self, query: &str, candidates: &[String]) -> SearchResult<Vec<f32>> {
            if candidates.is_empty() {
                return Ok(Vec::new());
            }

            let request = RerankRequest {
                model: &self.model,
                query,
                documents: candidates,
            };

            let mut builder = self.client.post(&self.url).json(&request);
            if let Some(ref key) = self.api_key {
                builder = builder.bearer_auth(key);
            }
            let response = builder.send().await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let response: RerankResponse = serde_json::from_str(&body)?;
            scores_in_input_order(response.results, candidates.len())
        }
    }

    fn scores_in_input_order(results: Vec<RerankResult>, expected: usize) -> SearchResult<Vec<f32>> {
        let mut scores: Vec<Option<f32>> = vec![None; expected];
        for result in results {
            let slot = scores.get_mut(result.index).ok_or_else(|| {
                SearchError::Rerank(format!("result index {} out of range", result.index))
            })?;
            *slot = Some(result.relevance_score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.ok_or_else(|| SearchError::Rerank(format!("no score for candidate {i}"))))
            .collect()
    }

}
