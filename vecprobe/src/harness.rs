//! Shared context for the three harness drivers.
//!
//! A [`Harness`] bundles the configuration with the embedding provider, the
//! encryption oracle, and the vector store. The drivers
//! ([`IngestPipeline`], [`SearchComparator`], [`InversionAttack`]) borrow it
//! and are otherwise independent.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecprobe::{Harness, HarnessConfig, CollectionTarget};
//!
//! let harness = Harness::builder()
//!     .config(HarnessConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .oracle(Arc::new(oracle))
//!     .vector_store(Arc::new(store))
//!     .build()?;
//!
//! harness.configure_oracle().await?;
//! let targets = [CollectionTarget::plain("raw"), CollectionTarget::encrypted("secure")];
//! harness.ingestion().prepare_collections(&targets).await?;
//! let report = harness.ingestion().ingest(&documents, &targets).await?;
//! ```

use std::sync::Arc;

use tracing::error;

use crate::attack::InversionAttack;
use crate::compare::SearchComparator;
use crate::config::HarnessConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{ProbeError, Result};
use crate::ingest::IngestPipeline;
use crate::inversion::Inverter;
use crate::oracle::EncryptionOracle;
use crate::vectorstore::VectorStore;

/// Configuration plus the external collaborators every driver shares.
#[derive(Clone)]
pub struct Harness {
    config: HarnessConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    oracle: Arc<dyn EncryptionOracle>,
    vector_store: Arc<dyn VectorStore>,
}

impl Harness {
    /// Create a new [`HarnessBuilder`].
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Return a reference to the harness configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the encryption oracle.
    pub fn oracle(&self) -> &Arc<dyn EncryptionOracle> {
        &self.oracle
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Push the configured oracle settings.
    ///
    /// Must complete before any ingestion into an encrypted collection or any
    /// comparison, since both encrypt.
    pub async fn configure_oracle(&self) -> Result<()> {
        self.oracle.configure(self.config.oracle).await.map_err(|e| {
            error!(error = %e, "failed to configure oracle");
            e
        })
    }

    /// The ingestion driver.
    pub fn ingestion(&self) -> IngestPipeline<'_> {
        IngestPipeline::new(self)
    }

    /// The comparative search driver.
    pub fn comparator(&self) -> SearchComparator<'_> {
        SearchComparator::new(self)
    }

    /// The inversion attack driver using `inverter`.
    pub fn attacker(&self, inverter: Arc<dyn Inverter>) -> InversionAttack<'_> {
        InversionAttack::new(self, inverter)
    }
}

/// Builder for constructing a [`Harness`].
///
/// All fields are required. Call [`build()`](HarnessBuilder::build) to
/// validate and produce the harness.
#[derive(Default)]
pub struct HarnessBuilder {
    config: Option<HarnessConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    oracle: Option<Arc<dyn EncryptionOracle>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl HarnessBuilder {
    /// Set the harness configuration.
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the encryption oracle.
    pub fn oracle(mut self, oracle: Arc<dyn EncryptionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`Harness`].
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if a field is missing or the embedding
    /// provider's dimension differs from the configured dimension.
    pub fn build(self) -> Result<Harness> {
        let config =
            self.config.ok_or_else(|| ProbeError::Config("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| ProbeError::Config("embedding_provider is required".to_string()))?;
        let oracle =
            self.oracle.ok_or_else(|| ProbeError::Config("oracle is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| ProbeError::Config("vector_store is required".to_string()))?;

        if embedding_provider.dimensions() != config.dimension() {
            return Err(ProbeError::Config(format!(
                "embedding provider produces {} dimensions but the harness is configured for {}",
                embedding_provider.dimensions(),
                config.dimension()
            )));
        }

        Ok(Harness { config, embedding_provider, oracle, vector_store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;
    use crate::oracle::LocalOracle;

    #[test]
    fn missing_collaborator_is_a_config_error() {
        let err = Harness::builder().config(HarnessConfig::default()).build().err().unwrap();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[test]
    fn dimension_disagreement_is_rejected() {
        let result = Harness::builder()
            .config(HarnessConfig::builder().dimension(32).build().unwrap())
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(16)))
            .oracle(Arc::new(LocalOracle::new()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build();
        assert!(matches!(result, Err(ProbeError::Config(_))));
    }

    #[tokio::test]
    async fn configure_oracle_pushes_configured_settings() {
        let harness = Harness::builder()
            .config(HarnessConfig::builder().dimension(16).build().unwrap())
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(16)))
            .oracle(Arc::new(LocalOracle::new()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap();
        assert!(harness.oracle().settings().await.is_none());
        harness.configure_oracle().await.unwrap();
        assert_eq!(harness.oracle().settings().await, Some(harness.config().oracle));
    }
}
