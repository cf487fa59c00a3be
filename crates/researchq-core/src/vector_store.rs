//! Vector store interface and an in-process implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{SearchError, SearchResult};
use crate::types::{ChunkMetadata, MetadataFilter, VectorMatch, VectorRecord};

/// External similarity service holding chunk vectors and their metadata
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id, returning how many were written
    async fn upsert(&self, records: Vec<VectorRecord>) -> SearchResult<usize>;

    /// Most similar records first
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> SearchResult<Vec<VectorMatch>>;

    /// Remove every record matching `filter`, returning how many were removed
    async fn delete(&self, filter: &MetadataFilter) -> SearchResult<usize>;
}

#[derive(Debug, Clone)]
struct StoredVector {
    vector: Vec<f32>,
    metadata: ChunkMetadata,
}

/// Brute-force cosine similarity store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Metadata stored under `id`
    pub fn get(&self, id: &str) -> Option<ChunkMetadata> {
        self.records.read().get(id).map(|r| r.metadata.clone())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> SearchResult<usize> {
        for record in &records {
            if record.id.trim().is_empty() {
                return Err(SearchError::InvalidMetadata("record id is empty".to_string()));
            }
            if record.vector.is_empty() {
                return Err(SearchError::VectorStore(format!(
                    "record {} has an empty vector",
                    record.id
                )));
            }
            record.metadata.validate()?;
        }

        let count = records.len();
        let mut stored = self.records.write();
        for record in records {
            stored.insert(
                record.id,
                StoredVector {
                    vector: record.vector,
                    metadata: record.metadata,
                },
            );
        }
        Ok(count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> SearchResult<Vec<VectorMatch>> {
        if top_k == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }

        let stored = self.records.read();
        let mut matches: Vec<VectorMatch> = stored
            .iter()
            .filter(|(_, r)| filter.map_or(true, |f| f.matches(&r.metadata)))
            .filter(|(_, r)| r.vector.len() == vector.len())
            .map(|(id, r)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &r.vector),
                metadata: r.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, filter: &MetadataFilter) -> SearchResult<usize> {
        let mut stored = self.records.write();
        let before = stored.len();
        stored.retain(|_, r| !filter.matches(&r.metadata));
        Ok(before - stored.len())
    }
}

/// Cosine similarity; 0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkType;

    fn record(id: &str, doc: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            metadata: ChunkMetadata {
                document_id: doc.to_string(),
                section: "Results".to_string(),
                chunk_type: ChunkType::Paragraph,
                text: format!("text of {id}"),
                parent_chunk_id: None,
                token_count: Some(3),
                sequence_index: Some(0),
            },
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_score_then_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("b", "d1", vec![1.0, 0.0]),
                record("a", "d1", vec![1.0, 0.0]),
                record("c", "d1", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let matches = store.query(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let top = store.query(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_and_delete_by_document() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("x1", "doc-x", vec![1.0, 0.0]),
                record("x2", "doc-x", vec![0.5, 0.5]),
                record("y1", "doc-y", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::document("doc-y");
        let matches = store.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "y1");

        let removed = store.delete(&MetadataFilter::document("doc-x")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_validates() {
        let store = InMemoryVectorStore::new();
        store.upsert(vec![record("a", "d", vec![1.0])]).await.unwrap();
        store.upsert(vec![record("a", "d", vec![2.0])]).await.unwrap();
        assert_eq!(store.len(), 1);

        let mut bad = record("b", "d", vec![1.0]);
        bad.metadata.section = String::new();
        let err = store.upsert(vec![bad]).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidMetadata(_)));
        assert!(store.get("b").is_none());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_skipped() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("short", "d", vec![1.0, 0.0]),
                record("long", "d", vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = store.query(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "long");
    }
}
