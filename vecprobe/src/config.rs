//! Configuration for harness runs and service endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::vectorstore::Distance;

/// Parameters pushed to the encryption oracle with `configure`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OracleSettings {
    /// Dimension of every vector the oracle will encrypt.
    pub dimension: usize,
    /// Scaling factor of the transform.
    pub scaling_factor: f64,
    /// Approximation (perturbation) factor of the transform.
    pub approximation_factor: f64,
}

/// Configuration parameters for a harness run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Oracle session parameters; `oracle.dimension` is also the collection size.
    pub oracle: OracleSettings,
    /// Distance metric collections are created with.
    pub distance: Distance,
    /// Depth of the top-k overlap comparison.
    pub top_k: usize,
    /// Number of hits requested from each collection per query.
    pub search_limit: usize,
    /// Step budget handed to the inversion procedure.
    pub inversion_steps: usize,
    /// Maximum number of records exfiltrated per collection.
    pub scroll_limit: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            oracle: OracleSettings {
                dimension: 768,
                scaling_factor: 10.0,
                approximation_factor: 5.0,
            },
            distance: Distance::Cosine,
            top_k: 5,
            search_limit: 10,
            inversion_steps: 20,
            scroll_limit: 100,
        }
    }
}

impl HarnessConfig {
    /// Create a new builder for constructing a [`HarnessConfig`].
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Vector dimension shared by the oracle and every collection.
    pub fn dimension(&self) -> usize {
        self.oracle.dimension
    }
}

/// Builder for constructing a validated [`HarnessConfig`].
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Set the vector dimension.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.config.oracle.dimension = dimension;
        self
    }

    /// Set the oracle scaling factor.
    pub fn scaling_factor(mut self, factor: f64) -> Self {
        self.config.oracle.scaling_factor = factor;
        self
    }

    /// Set the oracle approximation factor.
    pub fn approximation_factor(mut self, factor: f64) -> Self {
        self.config.oracle.approximation_factor = factor;
        self
    }

    /// Set the collection distance metric.
    pub fn distance(mut self, distance: Distance) -> Self {
        self.config.distance = distance;
        self
    }

    /// Set the top-k overlap depth.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of hits requested per search.
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.config.search_limit = limit;
        self
    }

    /// Set the inversion step budget.
    pub fn inversion_steps(mut self, steps: usize) -> Self {
        self.config.inversion_steps = steps;
        self
    }

    /// Set the maximum number of records read per collection during an attack.
    pub fn scroll_limit(mut self, limit: usize) -> Self {
        self.config.scroll_limit = limit;
        self
    }

    /// Build the [`HarnessConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if:
    /// - `dimension == 0`
    /// - `scaling_factor <= 0` or `approximation_factor < 0`
    /// - `top_k == 0` or `search_limit < top_k`
    /// - `inversion_steps == 0` or `scroll_limit == 0`
    pub fn build(self) -> Result<HarnessConfig> {
        let c = &self.config;
        if c.oracle.dimension == 0 {
            return Err(ProbeError::Config("dimension must be greater than zero".to_string()));
        }
        if c.oracle.scaling_factor.is_nan() || c.oracle.scaling_factor <= 0.0 {
            return Err(ProbeError::Config(format!(
                "scaling_factor ({}) must be positive",
                c.oracle.scaling_factor
            )));
        }
        if c.oracle.approximation_factor.is_nan() || c.oracle.approximation_factor < 0.0 {
            return Err(ProbeError::Config(format!(
                "approximation_factor ({}) must not be negative",
                c.oracle.approximation_factor
            )));
        }
        if c.top_k == 0 {
            return Err(ProbeError::Config("top_k must be greater than zero".to_string()));
        }
        if c.search_limit < c.top_k {
            return Err(ProbeError::Config(format!(
                "search_limit ({}) must be at least top_k ({})",
                c.search_limit, c.top_k
            )));
        }
        if c.inversion_steps == 0 {
            return Err(ProbeError::Config("inversion_steps must be greater than zero".to_string()));
        }
        if c.scroll_limit == 0 {
            return Err(ProbeError::Config("scroll_limit must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}

/// Addresses of the external services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoints {
    /// Base URL of the encryption oracle.
    pub oracle_url: String,
    /// Token sent to the oracle, if any.
    pub oracle_token: Option<String>,
    /// Base URL of the vector store.
    pub store_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            oracle_url: "http://localhost:8200".to_string(),
            oracle_token: Some("root".to_string()),
            store_url: "http://localhost:6333".to_string(),
        }
    }
}

impl Endpoints {
    /// Read `VAULT_ADDR`, `VAULT_TOKEN` and `QDRANT_URL`, falling back to local defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            oracle_url: std::env::var("VAULT_ADDR").unwrap_or(defaults.oracle_url),
            oracle_token: std::env::var("VAULT_TOKEN").ok().or(defaults.oracle_token),
            store_url: std::env::var("QDRANT_URL").unwrap_or(defaults.store_url),
        }
    }
}
