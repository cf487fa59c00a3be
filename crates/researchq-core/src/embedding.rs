//! Embedding provider interface and an OpenAI-compatible client

use async_trait::async_trait;

use crate::error::SearchResult;

/// Embedding generation provider.
///
/// Whitespace-only input yields an empty vector, not an error. Batch output
/// is one-to-one with the input, in order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>>;

    /// Dimensionality of produced vectors, if known
    fn dimensions(&self) -> usize;

    /// Human-readable provider name
    fn name(&self) -> &str;
}

#[cfg(feature = "http")]
pub use client::OpenAiEmbeddingClient;

#[cfg(feature = "http")]
mod client {
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::EmbeddingProvider;
    use crate::config::EmbeddingConfig;
    use crate::error::{SearchError, SearchResult};
    use crate::text::truncate_chars;

    /// Most embedding APIs reject inputs past ~8K tokens
    const MAX_CHARS: usize = 8000;

    /// OpenAI-compatible `/embeddings` client
    pub struct OpenAiEmbeddingClient {
        config: EmbeddingConfig,
        api_key: String,
        client: Client,
        /// Actual dimensions detected from API response (0 = not yet detected)
        actual_dimensions: AtomicUsize,
    }

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: Vec<String>,
        /// Only sent for models that support it (text-embedding-3-*)
        #[serde(skip_serializing_if = "Option::is_none")]
        dimensions: Option<usize>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
        index: usize,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    impl OpenAiEmbeddingClient {
        /// Create a new embedding client. Fails without an API key.
        pub fn new(config: EmbeddingConfig) -> SearchResult<Self> {
            Self::with_env(config, |name| std::env::var(name).ok())
        }

        /// Like [`OpenAiEmbeddingClient::new`], reading fallback keys through `var`
        pub fn with_env<F>(config: EmbeddingConfig, var: F) -> SearchResult<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let api_key = config.resolve_api_key(var)?;

            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;

            Ok(Self {
                config,
                api_key,
                client,
                actual_dimensions: AtomicUsize::new(0),
            })
        }

        /// Get actual dimensions detected from API (0 if not yet detected)
        pub fn actual_dimensions(&self) -> usize {
            self.actual_dimensions.load(Ordering::Relaxed)
        }

        async fn request_batch(&self, texts: Vec<String>) -> SearchResult<Vec<Vec<f32>>> {
            let input_count = texts.len();
            let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));

            let dimensions = self
                .config
                .model
                .starts_with("text-embedding-3")
                .then_some(self.config.dimensions);

            let request = EmbeddingRequest {
                model: &self.config.model,
                input: texts.iter().map(|t| truncate_chars(t, MAX_CHARS)).collect(),
                dimensions,
            };

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let response: EmbeddingResponse = serde_json::from_str(&body)?;

            if response.data.len() != input_count {
                return Err(SearchError::Embedding(format!(
                    "Embedding count mismatch: sent {} texts, got {} embeddings",
                    input_count,
                    response.data.len()
                )));
            }

            let mut data = response.data;
            data.sort_by_key(|d| d.index);

            if let Some(first) = data.first() {
                self.record_dimensions(first.embedding.len());
            }

            Ok(data.into_iter().map(|d| d.embedding).collect())
        }

        fn record_dimensions(&self, detected: usize) {
            let current = self.actual_dimensions.load(Ordering::Relaxed);
            if current == 0 {
                self.actual_dimensions.store(detected, Ordering::Relaxed);
                log::info!("Auto-detected embedding dimensions: {}", detected);
            } else if current != detected {
                log::warn!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    current,
                    detected
                );
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OpenAiEmbeddingClient {
        async fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
            let mut vectors = self.embed_batch(&[text.to_string()]).await?;
            vectors
                .pop()
                .ok_or_else(|| SearchError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
            let mut output = vec![Vec::new(); texts.len()];

            // Blank inputs keep their empty slot and are never sent
            let pending: Vec<usize> = texts
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.trim().is_empty())
                .map(|(i, _)| i)
                .collect();

            for batch in pending.chunks(self.config.batch_size.max(1)) {
                let inputs = batch.iter().map(|&i| texts[i].clone()).collect();
                let vectors = self.request_batch(inputs).await?;
                for (&i, vector) in batch.iter().zip(vectors) {
                    output[i] = vector;
                }
            }

            Ok(output)
        }

        fn dimensions(&self) -> usize {
            match self.actual_dimensions() {
                0 => self.config.dimensions,
                actual => actual,
            }
        }

        fn name(&self) -> &str {
            &self.config.model
        }
    }

}
