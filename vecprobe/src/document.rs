//! Data types for documents, stored records, and search hits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload field that carries the source text of a stored record.
pub const TEXT_FIELD: &str = "text";

/// Namespace for content-derived document ids.
const CONTENT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_9a4d_4e53_8c0a_57d2_e1b9_03a4);

/// A source document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier shared by every collection the document is written to.
    pub id: String,
    /// The source text.
    pub text: String,
    /// Auxiliary fields copied into the stored payload.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with an explicit id and no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build documents from texts, allocating ids with the given policy.
    pub fn with_policy<S: AsRef<str>>(texts: &[S], policy: &IdPolicy) -> Vec<Document> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Document::new(policy.allocate(index, text.as_ref()), text.as_ref()))
            .collect()
    }

    /// The payload written next to every vector for this document.
    pub fn payload(&self) -> HashMap<String, serde_json::Value> {
        let mut payload: HashMap<String, serde_json::Value> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        payload.insert(TEXT_FIELD.to_string(), serde_json::Value::String(self.text.clone()));
        payload
    }
}

/// How document identifiers are allocated.
///
/// Both policies are deterministic so fixtures and reruns produce the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdPolicy {
    /// UUIDv5 derived from the document text. Accepted by Qdrant as a point id.
    ContentHash,
    /// `{prefix}-{n:04}` with `n` starting at 1.
    Sequence {
        /// Prefix prepended to every id.
        prefix: String,
    },
}

impl IdPolicy {
    /// Allocate the id for the `index`-th text.
    pub fn allocate(&self, index: usize, text: &str) -> String {
        match self {
            IdPolicy::ContentHash => Uuid::new_v5(&CONTENT_NAMESPACE, text.as_bytes()).to_string(),
            IdPolicy::Sequence { prefix } => format!("{prefix}-{:04}", index + 1),
        }
    }
}

/// A vector held in exactly one collection, keyed by its document id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    /// Document id.
    pub id: String,
    /// Either the raw embedding or its ciphertext.
    pub vector: Vec<f32>,
    /// Payload stored alongside the vector.
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl StoredRecord {
    /// The source text recorded in the payload, if any.
    pub fn text(&self) -> Option<&str> {
        self.payload.get(TEXT_FIELD).and_then(serde_json::Value::as_str)
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// The similarity score (higher is more similar).
    pub score: f32,
    /// Payload stored alongside the vector.
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

/// A collection the ingestion pipeline writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTarget {
    /// Collection name.
    pub name: String,
    /// Whether vectors are passed through the oracle before upsert.
    pub encrypted: bool,
}

impl CollectionTarget {
    /// A collection that stores raw embeddings.
    pub fn plain(name: impl Into<String>) -> Self {
        Self { name: name.into(), encrypted: false }
    }

    /// A collection that stores ciphertext vectors.
    pub fn encrypted(name: impl Into<String>) -> Self {
        Self { name: name.into(), encrypted: true }
    }
}
