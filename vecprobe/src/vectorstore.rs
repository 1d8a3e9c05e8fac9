//! Vector store capability set consumed by the harness.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{SearchHit, StoredRecord};
use crate::error::Result;

/// Distance metric a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Negated Euclidean distance.
    Euclid,
}

impl Distance {
    /// Name used on the wire by Qdrant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

/// A storage backend for vectors with similarity search.
///
/// Any backend satisfying these calls can stand behind the harness.
///
/// # Example
///
/// ```rust,ignore
/// use vecprobe::{InMemoryVectorStore, VectorStore, Distance};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("raw", 768, Distance::Cosine).await?;
/// store.upsert("raw", &records).await?;
/// let hits = store.search("raw", &query, 10).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Human-readable backend name used in errors and logs.
    fn backend(&self) -> &str;

    /// Create a named collection.
    async fn create_collection(&self, name: &str, dimensions: usize, distance: Distance)
    -> Result<()>;

    /// Delete a named collection. A missing collection is not an error.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace records by id.
    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()>;

    /// Return at most `limit` hits ordered by descending score.
    async fn search(&self, collection: &str, vector: &[f32], limit: usize)
    -> Result<Vec<SearchHit>>;

    /// Return up to `limit` stored records with their vectors and payloads.
    async fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<StoredRecord>>;
}
