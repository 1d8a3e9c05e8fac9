//! Qdrant vector store backend over the REST API.
//!
//! This module is only available when the `http` feature is enabled.
//!
//! Provides [`QdrantRestStore`] which implements [`VectorStore`] with plain
//! `reqwest` calls against Qdrant's HTTP interface (default port 6333).
//!
//! Qdrant only accepts unsigned integers and UUIDs as point ids, so documents
//! headed for Qdrant should use [`IdPolicy::ContentHash`](crate::IdPolicy).
//!
//! # Example
//!
//! ```rust,ignore
//! use vecprobe::qdrant::QdrantRestStore;
//!
//! let store = QdrantRestStore::new("http://localhost:6333");
//! store.create_collection("raw_documents", 768, Distance::Cosine).await?;
//! store.upsert("raw_documents", &records).await?;
//! let hits = store.search("raw_documents", &query, 10).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::{SearchHit, StoredRecord};
use crate::error::{ProbeError, Result};
use crate::vectorstore::{Distance, VectorStore};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/) over REST.
pub struct QdrantRestStore {
    client: reqwest::Client,
    base_url: String,
}

impl QdrantRestStore {
    /// Create a new store client for the Qdrant instance at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a new store client with the default URL (`http://localhost:6333`).
    pub fn default_url() -> Self {
        Self::new("http://localhost:6333")
    }

    /// Use an existing `reqwest` client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{collection}{suffix}", self.base_url)
    }

    fn map_err(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::VectorStore { backend: "qdrant".to_string(), message: e.to_string() }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(%status, "qdrant returned an error status");
        Err(Self::map_err(format!("qdrant returned {status}: {body}")))
    }

    async fn result<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Self::map_err(format!("failed to parse response: {e}")))?;
        Ok(envelope.result)
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Qdrant point ids are either unsigned integers or UUID strings.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    fn from_id(id: &str) -> Self {
        id.parse::<u64>().map(PointId::Num).unwrap_or_else(|_| PointId::Uuid(id.to_string()))
    }

    fn into_string(self) -> String {
        match self {
            PointId::Num(n) => n.to_string(),
            PointId::Uuid(s) => s,
        }
    }
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct PointStruct<'a> {
    id: PointId,
    vector: &'a [f32],
    payload: &'a HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct ScrollRequest {
    limit: usize,
    with_vector: bool,
    with_payload: bool,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<RetrievedPoint>,
}

#[derive(Deserialize)]
struct RetrievedPoint {
    id: PointId,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    payload: Option<HashMap<String, serde_json::Value>>,
}

// ── VectorStore implementation ─────────────────────────────────────

#[async_trait]
impl VectorStore for QdrantRestStore {
    fn backend(&self) -> &str {
        "qdrant"
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        let body = CreateCollection {
            vectors: VectorParams { size: dimensions, distance: distance.as_str() },
        };
        let response =
            self.client.put(self.url(name, "")).json(&body).send().await.map_err(Self::map_err)?;
        Self::check_status(response).await?;
        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response =
            self.client.delete(self.url(name, "")).send().await.map_err(Self::map_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = name, "qdrant collection already absent");
            return Ok(());
        }
        Self::check_status(response).await?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let body = UpsertPoints {
            points: records
                .iter()
                .map(|r| PointStruct {
                    id: PointId::from_id(&r.id),
                    vector: &r.vector,
                    payload: &r.payload,
                })
                .collect(),
        };
        let response = self
            .client
            .put(self.url(collection, "/points?wait=true"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check_status(response).await?;

        debug!(collection, count = records.len(), "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let body = SearchRequest { vector, limit, with_payload: true };
        let response = self
            .client
            .post(self.url(collection, "/points/search"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let points: Vec<ScoredPoint> = Self::result(response).await?;

        Ok(points
            .into_iter()
            .map(|p| SearchHit {
                id: p.id.into_string(),
                score: p.score,
                payload: p.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<StoredRecord>> {
        let body = ScrollRequest { limit, with_vector: true, with_payload: true };
        let response = self
            .client
            .post(self.url(collection, "/points/scroll"))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let page: ScrollPage = Self::result(response).await?;

        page.points
            .into_iter()
            .map(|p| {
                let id = p.id.into_string();
                let vector = p.vector.ok_or_else(|| {
                    Self::map_err(format!("point '{id}' was returned without a vector"))
                })?;
                Ok(StoredRecord { id, vector, payload: p.payload.unwrap_or_default() })
            })
            .collect()
    }
}
