//! In-memory vector store.
//!
//! [`InMemoryVectorStore`] is a `HashMap`-backed store behind a
//! `tokio::sync::RwLock`. It implements the full capability set, including
//! scroll, so every harness driver can run without external services.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{SearchHit, StoredRecord};
use crate::embedding::cosine_similarity;
use crate::error::{ProbeError, Result};
use crate::vectorstore::{Distance, VectorStore};

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    distance: Distance,
    // BTreeMap keeps scroll order stable across runs.
    records: BTreeMap<String, StoredRecord>,
}

/// An in-memory vector store.
///
/// Collections are stored as collection name → record id → record.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> ProbeError {
        ProbeError::VectorStore {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => -a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt(),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        "InMemory"
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.insert(
            name.to_string(),
            Collection { dimensions, distance, records: BTreeMap::new() },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        if let Some(bad) = records.iter().find(|r| r.vector.len() != store.dimensions) {
            return Err(ProbeError::DimensionMismatch {
                expected: store.dimensions,
                actual: bad.vector.len(),
            });
        }
        for record in records {
            store.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        if vector.len() != store.dimensions {
            return Err(ProbeError::DimensionMismatch {
                expected: store.dimensions,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<SearchHit> = store
            .records
            .values()
            .map(|record| SearchHit {
                id: record.id.clone(),
                score: score(store.distance, &record.vector, vector),
                payload: record.payload.clone(),
            })
            .collect();

        // Stable sort over id-ordered records: ties resolve by id.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<StoredRecord>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(store.records.values().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>) -> StoredRecord {
        StoredRecord { id: id.into(), vector, payload: HashMap::new() }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_and_respects_limit() {
        let store = InMemoryVectorStore::new();
        store.create_collection("raw", 2, Distance::Cosine).await.unwrap();
        store
            .upsert(
                "raw",
                &[
                    record("a", vec![1.0, 0.0]),
                    record("b", vec![0.7, 0.7]),
                    record("c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("raw", &[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn delete_of_missing_collection_is_ok() {
        let store = InMemoryVectorStore::new();
        assert!(store.delete_collection("nope").await.is_ok());
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.create_collection("raw", 3, Distance::Cosine).await.unwrap();
        let err = store.upsert("raw", &[record("a", vec![1.0])]).await.unwrap_err();
        assert!(matches!(err, ProbeError::DimensionMismatch { expected: 3, actual: 1 }));
    }

    #[tokio::test]
    async fn search_rejects_query_of_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.create_collection("raw", 3, Distance::Cosine).await.unwrap();
        store.upsert("raw", &[record("a", vec![1.0, 0.0, 0.0])]).await.unwrap();

        let err = store.search("raw", &[1.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, ProbeError::DimensionMismatch { expected: 3, actual: 2 }));
        let err = store.search("raw", &[1.0, 0.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, ProbeError::DimensionMismatch { expected: 3, actual: 4 }));
    }

    #[tokio::test]
    async fn scroll_returns_records_in_id_order() {
        let store = InMemoryVectorStore::new();
        store.create_collection("raw", 1, Distance::Dot).await.unwrap();
        store
            .upsert("raw", &[record("b", vec![1.0]), record("a", vec![2.0]), record("c", vec![3.0])])
            .await
            .unwrap();
        let page = store.scroll("raw", 2).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
