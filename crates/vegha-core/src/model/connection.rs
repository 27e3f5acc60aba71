// ── Connection state ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of the backend connection.
///
/// Owned by the [`ConnectionManager`](crate::ConnectionManager); read-only
/// to everyone else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// `true` while a handshake is in flight or the session is live.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// One observed change of [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    /// Reconnect progress as of this transition.
    pub reconnect: ReconnectStatus,
}

/// Progress of the automatic reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconnectStatus {
    /// No automatic reconnect in progress.
    #[default]
    Idle,
    /// Automatic attempt `attempt` of `max_attempts` is pending or in flight.
    Retrying { attempt: u32, max_attempts: u32 },
    /// The budget ran out; nothing happens until the next explicit open.
    Exhausted { attempts: u32 },
}

impl ReconnectStatus {
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
