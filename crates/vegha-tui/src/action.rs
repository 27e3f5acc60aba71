//! UI actions. Every state change in the app flows through one of these.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use vegha_core::{ConnectionState, MetricsSnapshot, ReconnectStatus, SimulationCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A transient message shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    ToggleHelp,

    // ── Connection ──
    /// Drop the session and reconnect with a fresh budget.
    Refresh,
    /// Close when active, open otherwise.
    ToggleConnection,
    ConnectionChanged {
        state: ConnectionState,
        reconnect: ReconnectStatus,
    },

    // ── Data ──
    MetricsUpdated {
        snapshot: Arc<MetricsSnapshot>,
        received_at: Option<DateTime<Utc>>,
    },

    // ── Simulation control ──
    /// Start when paused, pause when running.
    TogglePlayback,
    ResetSimulation,
    CycleSpeed,
    /// A control command to send to the backend.
    Send(SimulationCommand),

    Notify(Notification),
}
