//! # vecprobe
//!
//! Verification and attack harness for distance-preserving vector encryption.
//!
//! An encryption oracle turns plaintext embeddings into ciphertext vectors
//! that are meant to keep approximate distances. `vecprobe` checks both sides
//! of that promise:
//!
//! - **Utility**: the same corpus is ingested into a plain and an encrypted
//!   collection, and each query's rankings are compared with top-k overlap,
//!   Spearman rank correlation, and Pearson score correlation.
//! - **Privacy**: stored vectors are exfiltrated and handed to an embedding
//!   inverter; every reconstruction is graded against the source text.
//!
//! ## Features
//!
//! - `http` (default): [`QdrantRestStore`], [`HttpEncryptionOracle`] and
//!   [`HttpInverter`], all over `reqwest`.
//! - `openai` (default): [`OpenAIEmbeddingProvider`].
//!
//! Without either feature the crate still builds with the in-memory store,
//! the local oracle and the hashing embedder.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vecprobe::{AttackMode, CollectionTarget, CorpusInverter, Document, Harness, HarnessConfig};
//! use vecprobe::{HashEmbeddingProvider, InMemoryVectorStore, LocalOracle};
//!
//! let embedder = Arc::new(HashEmbeddingProvider::new(768));
//! let harness = Harness::builder()
//!     .config(HarnessConfig::default())
//!     .embedding_provider(embedder.clone())
//!     .oracle(Arc::new(LocalOracle::new()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//! harness.configure_oracle().await?;
//!
//! let targets = [CollectionTarget::plain("raw"), CollectionTarget::encrypted("secure")];
//! harness.ingestion().prepare_collections(&targets).await?;
//! harness.ingestion().ingest(&[Document::new("d1", "The cat sat on the mat.")], &targets).await?;
//!
//! let inverter = Arc::new(CorpusInverter::build(embedder, &["The cat sat on the mat."][..]).await?);
//! let report = harness.attacker(inverter).attack_collection("secure", AttackMode::Protected).await?;
//! assert!(!report.breached());
//! ```

pub mod attack;
pub mod compare;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod harness;
pub mod ingest;
pub mod inmemory;
pub mod inversion;
pub mod metrics;
#[cfg(feature = "openai")]
pub mod openai;
pub mod oracle;
#[cfg(feature = "http")]
pub mod qdrant;
#[cfg(feature = "http")]
pub mod vault;
pub mod vectorstore;
pub mod verdict;

pub use attack::{AttackReport, AttackVerdict, InversionAttack};
pub use compare::{
    BatchComparison, ComparisonMetrics, ComparisonRecord, ComparisonSummary, Fidelity,
    SearchComparator,
};
pub use config::{Endpoints, HarnessConfig, HarnessConfigBuilder, OracleSettings};
pub use document::{CollectionTarget, Document, IdPolicy, SearchHit, StoredRecord};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{ItemFailure, ProbeError, Result};
pub use harness::{Harness, HarnessBuilder};
pub use ingest::{IngestPipeline, IngestReport, IngestedDocument};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "http")]
pub use inversion::HttpInverter;
pub use inversion::{CorpusInverter, Inverter};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use oracle::{EncryptionOracle, LocalOracle};
#[cfg(feature = "http")]
pub use qdrant::QdrantRestStore;
#[cfg(feature = "http")]
pub use vault::{HttpEncryptionOracle, OracleRoutes};
pub use vectorstore::{Distance, VectorStore};
pub use verdict::{AttackMode, Verdict};
