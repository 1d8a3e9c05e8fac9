//! Comparative search: plain vs. encrypted ranking fidelity.
//!
//! The same query is embedded once, searched directly against the plain
//! collection, and searched against the encrypted collection after passing
//! through the oracle. The two rankings are then scored with the statistics
//! in [`metrics`](crate::metrics).

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::document::SearchHit;
use crate::error::{ItemFailure, ProbeError, Result};
use crate::harness::Harness;
use crate::metrics::{mean_defined, rank_correlation, score_correlation, top_k_overlap};

/// Fidelity metrics for one pair of result lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComparisonMetrics {
    /// Shared fraction of the two top-k prefixes, in `[0, 1]`.
    pub top_k_overlap: f64,
    /// Spearman correlation of rankings, absent when undefined.
    pub rank_correlation: Option<f64>,
    /// Pearson correlation of scores over shared ids, absent when undefined.
    pub score_correlation: Option<f64>,
}

impl ComparisonMetrics {
    /// Score two result lists at depth `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if `top_k` exceeds either list.
    pub fn from_hits(plain: &[SearchHit], encrypted: &[SearchHit], top_k: usize) -> Result<Self> {
        let plain_ids: Vec<&str> = plain.iter().map(|h| h.id.as_str()).collect();
        let encrypted_ids: Vec<&str> = encrypted.iter().map(|h| h.id.as_str()).collect();
        Ok(Self {
            top_k_overlap: top_k_overlap(&plain_ids, &encrypted_ids, top_k)?,
            rank_correlation: rank_correlation(&plain_ids, &encrypted_ids),
            score_correlation: score_correlation(plain, encrypted),
        })
    }
}

/// Per-query comparison record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRecord {
    /// The query text.
    pub query: String,
    /// Hits from the plain collection.
    pub plain: Vec<SearchHit>,
    /// Hits from the encrypted collection.
    pub encrypted: Vec<SearchHit>,
    /// Metrics derived from the two hit lists.
    pub metrics: ComparisonMetrics,
}

/// Coarse grade of the mean top-k overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fidelity {
    /// Mean overlap of at least 0.8.
    Excellent,
    /// Mean overlap of at least 0.6.
    Good,
    /// Mean overlap of at least 0.4.
    Moderate,
    /// Anything lower.
    Poor,
}

/// Means across a batch, each taken over the queries where the metric is defined.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ComparisonSummary {
    /// Number of queries that produced a comparison.
    pub queries: usize,
    /// Mean top-k overlap.
    pub mean_top_k_overlap: Option<f64>,
    /// Mean rank correlation over queries where it is defined.
    pub mean_rank_correlation: Option<f64>,
    /// Queries contributing to `mean_rank_correlation`.
    pub rank_defined: usize,
    /// Mean score correlation over queries where it is defined.
    pub mean_score_correlation: Option<f64>,
    /// Queries contributing to `mean_score_correlation`.
    pub score_defined: usize,
}

impl ComparisonSummary {
    /// Aggregate per-query metrics.
    pub fn from_metrics<'m, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'m ComparisonMetrics>,
    {
        let metrics: Vec<&ComparisonMetrics> = metrics.into_iter().collect();
        Self {
            queries: metrics.len(),
            mean_top_k_overlap: mean_defined(metrics.iter().map(|m| Some(m.top_k_overlap))),
            mean_rank_correlation: mean_defined(metrics.iter().map(|m| m.rank_correlation)),
            rank_defined: metrics.iter().filter(|m| m.rank_correlation.is_some()).count(),
            mean_score_correlation: mean_defined(metrics.iter().map(|m| m.score_correlation)),
            score_defined: metrics.iter().filter(|m| m.score_correlation.is_some()).count(),
        }
    }

    /// Grade the mean overlap. Absent for an empty batch.
    pub fn verdict(&self) -> Option<Fidelity> {
        self.mean_top_k_overlap.map(|overlap| match overlap {
            o if o >= 0.8 => Fidelity::Excellent,
            o if o >= 0.6 => Fidelity::Good,
            o if o >= 0.4 => Fidelity::Moderate,
            _ => Fidelity::Poor,
        })
    }
}

/// Outcome of a batch comparison, in input order.
#[derive(Debug, Default)]
pub struct BatchComparison {
    /// Successful per-query records.
    pub records: Vec<ComparisonRecord>,
    /// Queries that failed, with their errors.
    pub failures: Vec<ItemFailure>,
    /// Aggregate over `records`.
    pub summary: ComparisonSummary,
}

/// The comparative search driver. Obtain one with [`Harness::comparator`].
pub struct SearchComparator<'a> {
    harness: &'a Harness,
}

impl<'a> SearchComparator<'a> {
    pub(crate) fn new(harness: &'a Harness) -> Self {
        Self { harness }
    }

    /// Compare one query across a plain and an encrypted collection at the
    /// configured `top_k`.
    pub async fn compare(
        &self,
        query: &str,
        plain_collection: &str,
        encrypted_collection: &str,
    ) -> Result<ComparisonRecord> {
        self.compare_at(query, plain_collection, encrypted_collection, self.harness.config().top_k)
            .await
    }

    /// Compare one query across a plain and an encrypted collection, scoring
    /// overlap at depth `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] naming the query if embedding,
    /// encryption, or either search fails, and [`ProbeError::Config`] if
    /// `top_k` is zero or fewer than `top_k` hits came back from either
    /// collection.
    pub async fn compare_at(
        &self,
        query: &str,
        plain_collection: &str,
        encrypted_collection: &str,
        top_k: usize,
    ) -> Result<ComparisonRecord> {
        let limit = self.harness.config().search_limit.max(top_k);
        let store = self.harness.vector_store();

        let embedding = self.harness.embedding_provider().embed(query).await.map_err(|e| {
            error!(query, error = %e, "query embedding failed");
            ProbeError::Pipeline(format!("embedding failed for query '{query}': {e}"))
        })?;

        let plain =
            store.search(plain_collection, &embedding, limit).await.map_err(|e| {
                error!(query, collection = plain_collection, error = %e, "search failed");
                ProbeError::Pipeline(format!(
                    "search failed for query '{query}' in collection '{plain_collection}': {e}"
                ))
            })?;

        // The query must go through the same transform as the stored vectors.
        let ciphertext = self.harness.oracle().encrypt(&embedding).await.map_err(|e| {
            error!(query, error = %e, "query encryption failed");
            ProbeError::Pipeline(format!("encryption failed for query '{query}': {e}"))
        })?;

        let encrypted = store
            .search(encrypted_collection, &ciphertext, limit)
            .await
            .map_err(|e| {
                error!(query, collection = encrypted_collection, error = %e, "search failed");
                ProbeError::Pipeline(format!(
                    "search failed for query '{query}' in collection '{encrypted_collection}': {e}"
                ))
            })?;

        let metrics = ComparisonMetrics::from_hits(&plain, &encrypted, top_k)?;
        info!(
            query,
            top_k_overlap = metrics.top_k_overlap,
            rank_correlation = ?metrics.rank_correlation,
            score_correlation = ?metrics.score_correlation,
            "query compared"
        );

        Ok(ComparisonRecord { query: query.to_string(), plain, encrypted, metrics })
    }

    /// Compare each query in order and aggregate.
    ///
    /// A failing query is recorded in [`BatchComparison::failures`]; the
    /// summary is computed over the queries that succeeded.
    pub async fn compare_batch<S: AsRef<str>>(
        &self,
        queries: &[S],
        plain_collection: &str,
        encrypted_collection: &str,
    ) -> BatchComparison {
        let mut batch = BatchComparison::default();
        for query in queries {
            let query = query.as_ref();
            match self.compare(query, plain_collection, encrypted_collection).await {
                Ok(record) => batch.records.push(record),
                Err(error) => {
                    warn!(query, error = %error, "query skipped");
                    batch.failures.push(ItemFailure { id: query.to_string(), error });
                }
            }
        }

        batch.summary = ComparisonSummary::from_metrics(batch.records.iter().map(|r| &r.metrics));
        info!(
            queries = batch.summary.queries,
            failed = batch.failures.len(),
            mean_top_k_overlap = ?batch.summary.mean_top_k_overlap,
            "comparison batch finished"
        );
        batch
    }
}
