// ── Runtime connection configuration ──
//
// These types describe *how* to talk to the simulation backend. They never
// touch disk; the CLI/TUI builds a `BackendConfig` (usually through
// `vegha-config`) and hands it in.

use std::time::Duration;

use url::Url;
use vegha_api::{BackendClient, HttpConfig, SocketIoConfig};

use crate::error::CoreError;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Fixed-delay, bounded reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay between a connection loss and the next attempt. Default: 1s.
    pub delay: Duration,

    /// Automatic attempts after a loss before settling at `disconnected`.
    /// Default: 5. Zero disables automatic reconnection.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_ms(&self) -> u64 {
        u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Configuration for one backend connection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend base URL (e.g., `http://localhost:5000`).
    pub url: Url,
    /// Handshake and HTTP request timeout.
    pub timeout: Duration,
    /// Reconnection behaviour after transport loss.
    pub reconnect: ReconnectPolicy,
    /// Signal count to report when an update carries no `traffic_lights`
    /// mapping. `None` reports 0.
    pub static_signal_count: Option<u64>,
}

impl BackendConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            static_signal_count: None,
        }
    }

    /// Parse `url` and build a config with default tuning.
    pub fn from_url(url: &str) -> Result<Self, CoreError> {
        let parsed = Url::parse(url).map_err(|e| CoreError::Config {
            message: format!("invalid backend URL '{url}': {e}"),
        })?;
        Ok(Self::new(parsed))
    }

    pub fn socketio_config(&self) -> SocketIoConfig {
        let mut cfg = SocketIoConfig::new(self.url.clone());
        cfg.handshake_timeout = self.timeout;
        cfg
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: self.timeout,
        }
    }

    /// Build an HTTP client for the backend's request/response endpoints.
    pub fn http_client(&self) -> Result<BackendClient, CoreError> {
        Ok(BackendClient::new(self.url.clone(), &self.http_config())?)
    }
}
