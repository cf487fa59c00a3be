//! Document indexer: chunk, embed, store

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::chunker::DocumentChunker;
use crate::embedding::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};
use crate::types::{Chunk, ChunkType, MetadataFilter, VectorRecord};
use crate::vector_store::VectorStore;

/// Statistics of one indexed document
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub document_id: String,
    /// Total chunks created
    pub total_chunks: usize,
    pub chunks_by_type: BTreeMap<ChunkType, usize>,
    /// Distinct section labels, in document order
    pub sections: Vec<String>,
    /// Time elapsed in milliseconds
    pub elapsed_ms: u64,
    pub indexed_at: DateTime<Utc>,
}

/// Index build progress
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexProgress {
    /// Current phase: "chunking", "embedding", "storing"
    pub phase: String,
    /// Current item being processed
    pub current: usize,
    /// Total items to process
    pub total: usize,
    /// Percentage complete (0-100)
    pub percent: u8,
}

impl IndexProgress {
    fn new(phase: &str, current: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((current * 100) / total).min(100) as u8
        };
        Self {
            phase: phase.to_string(),
            current,
            total,
            percent,
        }
    }
}

/// Writes chunk vectors and metadata to the vector store
pub struct Indexer {
    chunker: DocumentChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        chunker: DocumentChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Replace the stored chunks of one document
    pub async fn index_document(&self, document_id: &str, text: &str) -> SearchResult<IndexStats> {
        self.index_document_with_progress(document_id, text, |_| {}).await
    }

    /// Replace the stored chunks of one document with progress callback
    pub async fn index_document_with_progress<F>(
        &self,
        document_id: &str,
        text: &str,
        mut on_progress: F,
    ) -> SearchResult<IndexStats>
    where
        F: FnMut(IndexProgress),
    {
        let start = Instant::now();

        on_progress(IndexProgress::new("chunking", 0, 1));
        let chunks = self.chunker.chunk(text, document_id);
        on_progress(IndexProgress::new("chunking", 1, 1));

        // Nothing is deleted until every chunk has a vector.
        let total = chunks.len();
        let mut records = Vec::with_capacity(total);
        for batch in chunks.chunks(self.batch_size) {
            on_progress(IndexProgress::new("embedding", records.len(), total));
            records.extend(self.embed_records(batch).await?);
        }

        let removed = self.store.delete(&MetadataFilter::document(document_id)).await?;
        if removed > 0 {
            log::debug!("{}: removed {} previous chunks", document_id, removed);
        }

        let mut stored = 0;
        let mut pending = records.into_iter().peekable();
        while pending.peek().is_some() {
            on_progress(IndexProgress::new("storing", stored, total));
            let batch: Vec<VectorRecord> = pending.by_ref().take(self.batch_size).collect();
            stored += self.store.upsert(batch).await?;
        }
        on_progress(IndexProgress::new("storing", stored, total));

        let stats = summarize(document_id, &chunks, start);
        log::info!(
            "Indexed {}: {} chunks in {}ms",
            document_id,
            stats.total_chunks,
            stats.elapsed_ms
        );
        Ok(stats)
    }

    /// Remove every stored chunk of a document
    pub async fn remove_document(&self, document_id: &str) -> SearchResult<usize> {
        let removed = self.store.delete(&MetadataFilter::document(document_id)).await?;
        log::info!("Removed {} chunks of {}", removed, document_id);
        Ok(removed)
    }

    async fn embed_records(&self, batch: &[Chunk]) -> SearchResult<Vec<VectorRecord>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(SearchError::Embedding(format!(
                "Embedding count mismatch: sent {} texts, got {} embeddings",
                batch.len(),
                vectors.len()
            )));
        }

        Ok(batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.chunk_id.clone(),
                vector,
                metadata: chunk.metadata(),
            })
            .collect())
    }
}

fn summarize(document_id: &str, chunks: &[Chunk], start: Instant) -> IndexStats {
    let mut chunks_by_type = BTreeMap::new();
    let mut sections: Vec<String> = Vec::new();
    for chunk in chunks {
        *chunks_by_type.entry(chunk.chunk_type).or_insert(0) += 1;
        if chunk.chunk_type != ChunkType::Synthetic && !sections.contains(&chunk.section_label) {
            sections.push(chunk.section_label.clone());
        }
    }

    IndexStats {
        document_id: document_id.to_string(),
        total_chunks: chunks.len(),
        chunks_by_type,
        sections,
        elapsed_ms: start.elapsed().as_millis() as u64,
        indexed_at: Utc::now(),
    }
}
