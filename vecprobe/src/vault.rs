//! HTTP encryption oracle client.
//!
//! This module is only available when the `http` feature is enabled.
//!
//! Speaks either the generic oracle routes (`POST /config`, `POST /encrypt`)
//! or the Vault vector plugin routes (`/v1/vector/config/rotate`,
//! `/v1/vector/encrypt/vector`, token in `X-Vault-Token`). Both the flat
//! `{"ciphertext": [...]}` and the Vault `{"data": {"ciphertext": [...]}}`
//! response shapes are accepted.
//!
//! # Example
//!
//! ```rust,ignore
//! use vecprobe::vault::{HttpEncryptionOracle, OracleRoutes};
//!
//! let oracle = HttpEncryptionOracle::new("http://localhost:8200")
//!     .with_routes(OracleRoutes::vault())
//!     .with_token("root");
//! oracle.configure(settings).await?;
//! let ciphertext = oracle.encrypt(&embedding).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::OracleSettings;
use crate::error::{ProbeError, Result};
use crate::oracle::{EncryptionOracle, check_session};

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Paths of the two oracle endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRoutes {
    /// Path of the configuration endpoint.
    pub config: String,
    /// Path of the encryption endpoint.
    pub encrypt: String,
}

impl Default for OracleRoutes {
    fn default() -> Self {
        Self { config: "/config".into(), encrypt: "/encrypt".into() }
    }
}

impl OracleRoutes {
    /// Routes exposed by the Vault vector encryption plugin.
    pub fn vault() -> Self {
        Self { config: "/v1/vector/config/rotate".into(), encrypt: "/v1/vector/encrypt/vector".into() }
    }
}

/// An [`EncryptionOracle`] reached over HTTP with `reqwest`.
///
/// The session settings pushed by [`configure`](EncryptionOracle::configure)
/// are held by the client; `encrypt` fails with
/// [`ProbeError::OracleNotConfigured`] until a configure call has succeeded.
pub struct HttpEncryptionOracle {
    client: reqwest::Client,
    base_url: String,
    routes: OracleRoutes,
    token: Option<String>,
    settings: RwLock<Option<OracleSettings>>,
}

impl HttpEncryptionOracle {
    /// Create a client for the oracle at `base_url` using the generic routes.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routes: OracleRoutes::default(),
            token: None,
            settings: RwLock::new(None),
        }
    }

    /// Use a different set of routes.
    pub fn with_routes(mut self, routes: OracleRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Send `token` in the `X-Vault-Token` header.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use an existing `reqwest` client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    fn map_err(context: &str, e: impl std::fmt::Display) -> ProbeError {
        error!(error = %e, "{context}");
        ProbeError::Oracle { message: format!("{context}: {e}") }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(%status, "oracle returned an error status");
        Err(ProbeError::Oracle { message: format!("oracle returned {status}: {body}") })
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ConfigRequest {
    dimension: usize,
    scaling_factor: f64,
    approximation_factor: f64,
}

#[derive(Serialize)]
struct EncryptRequest<'a> {
    vector: &'a [f32],
}

#[derive(Deserialize)]
struct Ciphertext {
    ciphertext: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EncryptResponse {
    Flat(Ciphertext),
    Enveloped { data: Ciphertext },
}

impl EncryptResponse {
    fn into_vector(self) -> Vec<f32> {
        match self {
            EncryptResponse::Flat(c) | EncryptResponse::Enveloped { data: c } => c.ciphertext,
        }
    }
}

// ── EncryptionOracle implementation ────────────────────────────────

#[async_trait]
impl EncryptionOracle for HttpEncryptionOracle {
    async fn configure(&self, settings: OracleSettings) -> Result<()> {
        let body = ConfigRequest {
            dimension: settings.dimension,
            scaling_factor: settings.scaling_factor,
            approximation_factor: settings.approximation_factor,
        };

        let response = self
            .request(&self.routes.config)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_err("configure request failed", e))?;
        Self::check_status(response).await?;

        *self.settings.write().await = Some(settings);
        info!(dimension = settings.dimension, "oracle session configured");
        Ok(())
    }

    async fn encrypt(&self, vector: &[f32]) -> Result<Vec<f32>> {
        check_session(*self.settings.read().await, vector)?;
        debug!(dimension = vector.len(), "encrypting vector");

        let response = self
            .request(&self.routes.encrypt)
            .json(&EncryptRequest { vector })
            .send()
            .await
            .map_err(|e| Self::map_err("encrypt request failed", e))?;
        let response = Self::check_status(response).await?;

        let ciphertext = response
            .json::<EncryptResponse>()
            .await
            .map_err(|e| Self::map_err("failed to parse encrypt response", e))?
            .into_vector();

        if ciphertext.len() != vector.len() {
            return Err(ProbeError::Oracle {
                message: format!(
                    "ciphertext has {} components, expected {}",
                    ciphertext.len(),
                    vector.len()
                ),
            });
        }
        Ok(ciphertext)
    }

    async fn settings(&self) -> Option<OracleSettings> {
        *self.settings.read().await
    }
}
