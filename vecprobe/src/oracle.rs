//! Encryption oracle capability and a local stand-in.
//!
//! The harness never decrypts. It only needs `configure` once per session and
//! `encrypt` for every stored vector and every query that targets an
//! encrypted collection.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::OracleSettings;
use crate::embedding::fnv1a;
use crate::error::{ProbeError, Result};

/// An external service that maps a plaintext vector to a ciphertext vector
/// of the same dimension.
///
/// `configure` is a precondition of `encrypt`: implementations must reject
/// encrypt calls issued before a session has been configured instead of
/// falling back to a hidden default.
#[async_trait]
pub trait EncryptionOracle: Send + Sync {
    /// Push session parameters. Must succeed before the first `encrypt`.
    async fn configure(&self, settings: OracleSettings) -> Result<()>;

    /// Transform one vector.
    async fn encrypt(&self, vector: &[f32]) -> Result<Vec<f32>>;

    /// The settings of the current session, if configured.
    async fn settings(&self) -> Option<OracleSettings>;
}

/// Check `vector` against the configured session.
pub(crate) fn check_session(
    settings: Option<OracleSettings>,
    vector: &[f32],
) -> Result<OracleSettings> {
    let settings = settings.ok_or(ProbeError::OracleNotConfigured)?;
    if vector.len() != settings.dimension {
        return Err(ProbeError::DimensionMismatch {
            expected: settings.dimension,
            actual: vector.len(),
        });
    }
    Ok(settings)
}

/// An in-process oracle with an exactly distance-preserving transform.
///
/// Each coordinate gets a fixed pseudo-random sign, the vector is mixed by a
/// normalized Walsh–Hadamard transform over power-of-two blocks, and the
/// result is multiplied by `scaling_factor`. The transform is orthogonal up to
/// scale, so cosine rankings survive exactly while sparse inputs become dense
/// and numerically unlike their source. `approximation_factor` is accepted but
/// no perturbation is applied.
///
/// Intended for tests and offline runs; it is not the production scheme.
#[derive(Debug, Default)]
pub struct LocalOracle {
    settings: RwLock<Option<OracleSettings>>,
}

impl LocalOracle {
    /// Create an unconfigured oracle.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sign(index: usize) -> f32 {
    if fnv1a(&(index as u64).to_le_bytes()) & 1 == 0 { 1.0 } else { -1.0 }
}

/// In-place normalized fast Walsh–Hadamard transform. `block.len()` must be a power of two.
fn hadamard(block: &mut [f32]) {
    let n = block.len();
    let mut h = 1;
    while h < n {
        for start in (0..n).step_by(h * 2) {
            for i in start..start + h {
                let (x, y) = (block[i], block[i + h]);
                block[i] = x + y;
                block[i + h] = x - y;
            }
        }
        h *= 2;
    }
    let norm = (n as f32).sqrt();
    for value in block.iter_mut() {
        *value /= norm;
    }
}

fn transform(vector: &[f32], scaling_factor: f32) -> Vec<f32> {
    let mut out: Vec<f32> = vector.iter().enumerate().map(|(i, v)| v * sign(i)).collect();
    let mut offset = 0;
    while offset < out.len() {
        let remaining = out.len() - offset;
        // Largest power of two that fits.
        let size = 1usize << (usize::BITS - 1 - remaining.leading_zeros());
        hadamard(&mut out[offset..offset + size]);
        offset += size;
    }
    for value in &mut out {
        *value *= scaling_factor;
    }
    out
}

#[async_trait]
impl EncryptionOracle for LocalOracle {
    async fn configure(&self, settings: OracleSettings) -> Result<()> {
        if settings.dimension == 0 {
            return Err(ProbeError::Oracle { message: "dimension must be greater than zero".into() });
        }
        *self.settings.write().await = Some(settings);
        Ok(())
    }

    async fn encrypt(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let settings = check_session(*self.settings.read().await, vector)?;
        Ok(transform(vector, settings.scaling_factor as f32))
    }

    async fn settings(&self) -> Option<OracleSettings> {
        *self.settings.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    fn settings(dimension: usize) -> OracleSettings {
        OracleSettings { dimension, scaling_factor: 10.0, approximation_factor: 5.0 }
    }

    #[tokio::test]
    async fn encrypt_before_configure_is_rejected() {
        let oracle = LocalOracle::new();
        let err = oracle.encrypt(&[1.0, 2.0]).await.unwrap_err();
        assert!(matches!(err, ProbeError::OracleNotConfigured));
    }

    #[tokio::test]
    async fn encrypt_checks_dimension() {
        let oracle = LocalOracle::new();
        oracle.configure(settings(4)).await.unwrap();
        let err = oracle.encrypt(&[1.0, 2.0]).await.unwrap_err();
        assert!(matches!(err, ProbeError::DimensionMismatch { expected: 4, actual: 2 }));
    }

    #[tokio::test]
    async fn transform_preserves_cosine_but_moves_coordinates() {
        let oracle = LocalOracle::new();
        oracle.configure(settings(12)).await.unwrap();
        let a = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let b = vec![0.6, 0.8, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let ea = oracle.encrypt(&a).await.unwrap();
        let eb = oracle.encrypt(&b).await.unwrap();

        assert_eq!(ea.len(), 12);
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&ea, &eb)).abs() < 1e-5);
        assert!(cosine_similarity(&a, &ea).abs() < 0.5);
    }

    #[test]
    fn hadamard_is_an_involution() {
        let mut block = vec![1.0, 2.0, 3.0, 4.0];
        hadamard(&mut block);
        hadamard(&mut block);
        for (got, want) in block.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((got - want).abs() < 1e-5);
        }
    }
}
