//! Inversion attack simulation against stored vectors.
//!
//! Models an adversary who has read access to a collection: records are
//! exfiltrated with their vectors and payloads, each vector is handed to an
//! [`Inverter`], and the reconstruction is graded against the source text in
//! the payload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::document::StoredRecord;
use crate::error::{ItemFailure, ProbeError, Result};
use crate::harness::Harness;
use crate::inversion::Inverter;
use crate::verdict::{AttackMode, Verdict, classify};

/// Graded outcome for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttackVerdict {
    /// Record id.
    pub id: String,
    /// The source text from the record payload.
    pub original: String,
    /// What the inverter produced.
    pub recovered: String,
    /// The classification.
    pub verdict: Verdict,
}

/// Verdicts and per-record failures, each in input order.
#[derive(Debug, Default)]
pub struct AttackReport {
    /// Records that were inverted and graded.
    pub verdicts: Vec<AttackVerdict>,
    /// Records whose inversion could not be attempted or failed.
    pub failures: Vec<ItemFailure>,
}

impl AttackReport {
    fn count(&self, f: impl Fn(&Verdict) -> bool) -> usize {
        self.verdicts.iter().filter(|v| f(&v.verdict)).count()
    }

    /// Records whose text was recovered.
    pub fn recovered(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Recovered))
    }

    /// Records with a partial match.
    pub fn partial(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Partial))
    }

    /// Records that inverted to garbage.
    pub fn garbage(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Garbage))
    }

    /// Records judged protected.
    pub fn protected(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Protected))
    }

    /// Records that leaked at least one token.
    pub fn leaked(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Leaked { .. }))
    }

    /// Whether any record exposed part of its source text.
    pub fn breached(&self) -> bool {
        self.verdicts.iter().any(|v| v.verdict.is_breach())
    }
}

/// The inversion attack driver. Obtain one with [`Harness::attacker`].
pub struct InversionAttack<'a> {
    harness: &'a Harness,
    inverter: Arc<dyn Inverter>,
}

impl<'a> InversionAttack<'a> {
    pub(crate) fn new(harness: &'a Harness, inverter: Arc<dyn Inverter>) -> Self {
        Self { harness, inverter }
    }

    /// Read up to `scroll_limit` records, vectors included, from `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] if the scroll fails.
    pub async fn exfiltrate(&self, collection: &str) -> Result<Vec<StoredRecord>> {
        let limit = self.harness.config().scroll_limit;
        let records = self.harness.vector_store().scroll(collection, limit).await.map_err(|e| {
            error!(collection, error = %e, "exfiltration failed");
            ProbeError::Pipeline(format!("failed to read collection '{collection}': {e}"))
        })?;
        info!(collection, count = records.len(), "records exfiltrated");
        Ok(records)
    }

    /// Invert one record and grade it.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] naming the record if it carries no
    /// source text or the inverter fails.
    pub async fn attack_record(
        &self,
        record: &StoredRecord,
        mode: AttackMode,
    ) -> Result<AttackVerdict> {
        let original = record.text().ok_or_else(|| {
            ProbeError::Pipeline(format!("record '{}' has no text payload", record.id))
        })?;

        let recovered = self
            .inverter
            .invert(&record.vector, self.harness.config().inversion_steps)
            .await
            .map_err(|e| {
                ProbeError::Pipeline(format!("inversion failed for record '{}': {e}", record.id))
            })?;

        let verdict = classify(mode, original, &recovered);
        info!(record.id = %record.id, ?mode, ?verdict, "record attacked");
        Ok(AttackVerdict {
            id: record.id.clone(),
            original: original.to_string(),
            recovered,
            verdict,
        })
    }

    /// Attack each record in order. A failing record does not stop the batch.
    pub async fn attack(&self, records: &[StoredRecord], mode: AttackMode) -> AttackReport {
        let mut report = AttackReport::default();
        for record in records {
            match self.attack_record(record, mode).await {
                Ok(verdict) => report.verdicts.push(verdict),
                Err(error) => {
                    warn!(record.id = %record.id, error = %error, "record skipped");
                    report.failures.push(ItemFailure { id: record.id.clone(), error });
                }
            }
        }
        info!(
            ?mode,
            attacked = report.verdicts.len(),
            failed = report.failures.len(),
            breached = report.breached(),
            "attack finished"
        );
        report
    }

    /// Exfiltrate `collection` and attack every record read.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Pipeline`] if the collection cannot be read.
    pub async fn attack_collection(
        &self,
        collection: &str,
        mode: AttackMode,
    ) -> Result<AttackReport> {
        let records = self.exfiltrate(collection).await?;
        Ok(self.attack(&records, mode).await)
    }
}
