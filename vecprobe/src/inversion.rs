//! Embedding-inversion procedures used by the attack simulator.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "http")]
use serde::{Deserialize, Serialize};
use tracing::debug;
#[cfg(feature = "http")]
use tracing::error;

use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::{ProbeError, Result};

/// Reconstructs text from a vector believed to be a text embedding.
#[async_trait]
pub trait Inverter: Send + Sync {
    /// Attempt a reconstruction within a budget of `steps` refinement steps.
    async fn invert(&self, vector: &[f32], steps: usize) -> Result<String>;
}

/// A dictionary attacker.
///
/// Embeds a list of candidate texts once and answers each inversion with the
/// candidate whose embedding is closest to the target vector. Below
/// `min_similarity` it reports an empty reconstruction, since no candidate is
/// a credible guess. The step budget is ignored.
pub struct CorpusInverter {
    candidates: Vec<(String, Vec<f32>)>,
    min_similarity: f32,
}

impl CorpusInverter {
    /// Default similarity below which no candidate is returned.
    pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

    /// Embed `candidates` with `provider`.
    pub async fn build<S: AsRef<str>>(
        provider: Arc<dyn EmbeddingProvider>,
        candidates: &[S],
    ) -> Result<Self> {
        let texts: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
        let embeddings = provider.embed_batch(&texts).await?;
        Ok(Self {
            candidates: texts.into_iter().map(str::to_string).zip(embeddings).collect(),
            min_similarity: Self::DEFAULT_MIN_SIMILARITY,
        })
    }

    /// Change the acceptance threshold.
    pub fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = threshold;
        self
    }
}

#[async_trait]
impl Inverter for CorpusInverter {
    async fn invert(&self, vector: &[f32], _steps: usize) -> Result<String> {
        let best = self
            .candidates
            .iter()
            .map(|(text, embedding)| (text, cosine_similarity(embedding, vector)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((text, similarity)) if similarity >= self.min_similarity => {
                debug!(similarity, "corpus candidate accepted");
                Ok(text.clone())
            }
            Some((_, similarity)) => {
                debug!(similarity, "no corpus candidate above threshold");
                Ok(String::new())
            }
            None => Err(ProbeError::Inversion { message: "candidate corpus is empty".into() }),
        }
    }
}

#[cfg(feature = "http")]
#[derive(Serialize)]
struct InvertRequest<'a> {
    embedding: &'a [f32],
    num_steps: usize,
}

#[cfg(feature = "http")]
#[derive(Deserialize)]
struct InvertResponse {
    text: String,
}

/// An [`Inverter`] backed by an HTTP inversion service.
///
/// Sends `POST {base_url}/invert` with `{"embedding": [...], "num_steps": n}`
/// and expects `{"text": "..."}` back.
///
/// Only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub struct HttpInverter {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpInverter {
    /// Create a client for the inversion service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Inverter for HttpInverter {
    async fn invert(&self, vector: &[f32], steps: usize) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/invert", self.base_url))
            .json(&InvertRequest { embedding: vector, num_steps: steps })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "inversion request failed");
                ProbeError::Inversion { message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Inversion {
                message: format!("service returned {status}: {body}"),
            });
        }

        let body: InvertResponse = response.json().await.map_err(|e| ProbeError::Inversion {
            message: format!("failed to parse response: {e}"),
        })?;
        Ok(body.text.trim().to_string())
    }
}
