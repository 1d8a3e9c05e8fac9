//! Error types for the `vecprobe` crate.

use thiserror::Error;

/// Errors that can occur while driving the oracle, the store, or the harness.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The encryption oracle was unreachable or returned a bad payload.
    #[error("Oracle error: {message}")]
    Oracle {
        /// A description of the failure.
        message: String,
    },

    /// An encrypt call was issued before the oracle session was configured.
    #[error("Oracle is not configured: call configure() before encrypting")]
    OracleNotConfigured,

    /// A vector did not have the dimension the session expects.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The configured dimension.
        expected: usize,
        /// The dimension actually seen.
        actual: usize,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding-inversion procedure failed.
    #[error("Inversion error: {message}")]
    Inversion {
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A failure of one item (document, query, or record) in a harness run.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for harness operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// A failure of one item in a batch, kept alongside the batch's successes.
#[derive(Debug)]
pub struct ItemFailure {
    /// Document id, query text, or record id that failed.
    pub id: String,
    /// What went wrong.
    pub error: ProbeError,
}
