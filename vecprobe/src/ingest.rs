//! Ingestion into parallel plain and encrypted collections.
//!
//! Each document is embedded once. Plain targets receive the raw vector;
//! encrypted targets receive a ciphertext requested from the oracle. Every
//! target stores the record under the document's own id so results can be
//! paired across collections later.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::document::{CollectionTarget, Document, StoredRecord};
use crate::embedding::cosine_similarity;
use crate::error::{ItemFailure, ProbeError, Result};
use crate::harness::Harness;

/// What was written for one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestedDocument {
    /// Document id used in every target collection.
    pub id: String,
    /// Collections the document was written to, in target order.
    pub collections: Vec<String>,
    /// Cosine similarity between the raw embedding and its first ciphertext,
    /// if any encrypted target was written.
    pub ciphertext_similarity: Option<f32>,
}

/// Outcome of a batch ingestion, in input order.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents written to every target.
    pub ingested: Vec<IngestedDocument>,
    /// Documents that failed. Targets written before the failure stay written.
    pub failures: Vec<ItemFailure>,
}

impl IngestReport {
    /// Whether every document was ingested.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The ingestion driver. Obtain one with [`Harness::ingestion`].
pub struct IngestPipeline<'a> {
    harness: &'a Harness,
}

impl<'a> IngestPipeline<'a> {
    pub(crate) fn new(harness: &'a Harness) -> Self {
        Self { harness }
    }

    /// Drop and recreate every target collection with the configured
    /// dimension and distance metric.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] naming the collection that failed.
    pub async fn prepare_collections(&self, targets: &[CollectionTarget]) -> Result<()> {
        let store = self.harness.vector_store();
        let config = self.harness.config();
        for target in targets {
            store.delete_collection(&target.name).await.map_err(|e| {
                error!(collection = %target.name, error = %e, "failed to delete collection");
                ProbeError::Pipeline(format!("failed to delete collection '{}': {e}", target.name))
            })?;
            store.create_collection(&target.name, config.dimension(), config.distance).await.map_err(
                |e| {
                    error!(collection = %target.name, error = %e, "failed to create collection");
                    ProbeError::Pipeline(format!(
                        "failed to create collection '{}': {e}",
                        target.name
                    ))
                },
            )?;
            info!(collection = %target.name, encrypted = target.encrypted, "collection ready");
        }
        Ok(())
    }

    /// Ingest one document into every target: embed → (encrypt) → upsert.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] carrying the document id and the
    /// collection being written when embedding, encryption, or upsert fails.
    pub async fn ingest_document(
        &self,
        document: &Document,
        targets: &[CollectionTarget],
    ) -> Result<IngestedDocument> {
        let embedding =
            self.harness.embedding_provider().embed(&document.text).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                ProbeError::Pipeline(format!(
                    "embedding failed for document '{}': {e}",
                    document.id
                ))
            })?;

        let payload = document.payload();
        let mut collections = Vec::with_capacity(targets.len());
        let mut ciphertext_similarity = None;

        for target in targets {
            let vector = if target.encrypted {
                let ciphertext = self.harness.oracle().encrypt(&embedding).await.map_err(|e| {
                    error!(document.id = %document.id, collection = %target.name, error = %e, "encryption failed during ingestion");
                    ProbeError::Pipeline(format!(
                        "encryption failed for document '{}' (collection '{}'): {e}",
                        document.id, target.name
                    ))
                })?;
                if ciphertext_similarity.is_none() {
                    ciphertext_similarity = Some(cosine_similarity(&embedding, &ciphertext));
                }
                ciphertext
            } else {
                embedding.clone()
            };

            let record =
                StoredRecord { id: document.id.clone(), vector, payload: payload.clone() };
            self.harness.vector_store().upsert(&target.name, &[record]).await.map_err(|e| {
                error!(document.id = %document.id, collection = %target.name, error = %e, "upsert failed during ingestion");
                ProbeError::Pipeline(format!(
                    "upsert failed for document '{}' (collection '{}'): {e}",
                    document.id, target.name
                ))
            })?;
            collections.push(target.name.clone());
        }

        info!(document.id = %document.id, collections = collections.len(), "ingested document");
        Ok(IngestedDocument { id: document.id.clone(), collections, ciphertext_similarity })
    }

    /// Ingest documents one at a time, in order.
    ///
    /// A failing document is recorded in [`IngestReport::failures`] and the
    /// batch continues with the next one.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if `targets` is empty.
    pub async fn ingest(
        &self,
        documents: &[Document],
        targets: &[CollectionTarget],
    ) -> Result<IngestReport> {
        if targets.is_empty() {
            return Err(ProbeError::Config("at least one target collection is required".into()));
        }

        let mut report = IngestReport::default();
        for document in documents {
            match self.ingest_document(document, targets).await {
                Ok(ingested) => report.ingested.push(ingested),
                Err(error) => {
                    warn!(document.id = %document.id, error = %error, "document skipped");
                    report.failures.push(ItemFailure { id: document.id.clone(), error });
                }
            }
        }

        info!(
            ingested = report.ingested.len(),
            failed = report.failures.len(),
            "ingestion batch finished"
        );
        Ok(report)
    }
}
