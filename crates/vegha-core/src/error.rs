// ── Core error types ──
//
// User-facing errors from vegha-core. Consumers never see WebSocket frames
// or JSON parse failures directly; the `From<vegha_api::Error>` impl
// translates transport-layer errors into domain variants.
//
// Connection loss is NOT an error here: it surfaces as a ConnectionState.
// These variants only cover explicit requests (commands, HTTP queries).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach simulation backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Not connected to the simulation backend")]
    NotConnected,

    #[error("Backend handshake timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Simulation errors ────────────────────────────────────────────
    #[error("Simulation not running: {message}")]
    SimulationNotRunning { message: String },

    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vegha_api::Error> for CoreError {
    fn from(err: vegha_api::Error) -> Self {
        match err {
            vegha_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_ms: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            vegha_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vegha_api::Error::UnsupportedScheme(scheme) => CoreError::Config {
                message: format!("Unsupported URL scheme '{scheme}'"),
            },
            vegha_api::Error::HandshakeTimeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            vegha_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            vegha_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            vegha_api::Error::ConnectRefused { message } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Socket.IO connection refused: {message}"),
            },
            vegha_api::Error::PingTimeout { window_ms } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("no ping from backend within {window_ms}ms"),
            },
            vegha_api::Error::NotConnected => CoreError::NotConnected,
            vegha_api::Error::SimulationNotRunning { message } => {
                CoreError::SimulationNotRunning { message }
            }
            vegha_api::Error::Protocol(message) => {
                CoreError::Internal(format!("Protocol error: {message}"))
            }
            vegha_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_domain_variants() {
        let err = CoreError::from(vegha_api::Error::NotConnected);
        assert!(matches!(err, CoreError::NotConnected));

        let err = CoreError::from(vegha_api::Error::HandshakeTimeout { timeout_ms: 250 });
        assert!(matches!(err, CoreError::Timeout { timeout_ms: 250 }));

        let err = CoreError::from(vegha_api::Error::SimulationNotRunning {
            message: "idle".into(),
        });
        assert_eq!(err.to_string(), "Simulation not running: idle");
    }
}
