// HTTP side of the backend: a thin reqwest wrapper for the handful of
// request/response endpoints next to the Socket.IO channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Shared settings for building the reqwest client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("vegha/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)
    }
}

/// Geographic extent of the simulated road network, as `[lat, lon]` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkBounds {
    pub southwest: [f64; 2],
    pub northeast: [f64; 2],
    pub center: [f64; 2],
}

/// `/api/bounds` answers with either the bounds or `{"error": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoundsResponse {
    Bounds(NetworkBounds),
    Failure { error: String },
}

/// Client for the backend's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: Url, config: &HttpConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url,
        })
    }

    /// Wrap an existing reqwest client (tests, custom middleware).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the network bounds of the running simulation.
    ///
    /// Fails with [`Error::SimulationNotRunning`] when the backend reports
    /// that no simulation is active.
    pub async fn bounds(&self) -> Result<NetworkBounds, Error> {
        let url = self.base_url.join("/api/bounds")?;
        tracing::debug!(%url, "fetching network bounds");

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match serde_json::from_str::<BoundsResponse>(&body) {
            Ok(BoundsResponse::Bounds(bounds)) => Ok(bounds),
            Ok(BoundsResponse::Failure { error }) => {
                Err(Error::SimulationNotRunning { message: error })
            }
            Err(e) => Err(Error::Deserialization {
                message: e.to_string(),
                body,
            }),
        }
    }
}
