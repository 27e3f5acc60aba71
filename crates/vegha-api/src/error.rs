use thiserror::Error;

/// Top-level error type for the `vegha-api` crate.
///
/// Covers the two surfaces the backend exposes: the Socket.IO push channel
/// and the small HTTP API. `vegha-core` maps these into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL uses a scheme we cannot map to a WebSocket endpoint.
    #[error("Unsupported URL scheme '{0}' (expected http, https, ws or wss)")]
    UnsupportedScheme(String),

    /// Handshake did not complete within the configured timeout.
    #[error("Handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    // ── WebSocket / Socket.IO ───────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The server refused the Socket.IO namespace connection.
    #[error("Socket.IO connection refused: {message}")]
    ConnectRefused { message: String },

    /// The server stopped answering within the Engine.IO ping window.
    #[error("No ping from server within {window_ms}ms")]
    PingTimeout { window_ms: u64 },

    /// A frame violated the Engine.IO / Socket.IO framing rules.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An outbound event was sent with no live session.
    #[error("No live session to send on")]
    NotConnected,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// `/api/bounds` answered with its "not running" error body.
    #[error("Simulation not running: {message}")]
    SimulationNotRunning { message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::HandshakeTimeout { .. }
            | Self::WebSocketConnect(_)
            | Self::WebSocketClosed { .. }
            | Self::PingTimeout { .. } => true,
            _ => false,
        }
    }
}
