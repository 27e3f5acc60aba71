//! Live-metrics synchronization between `vegha-api` and UI consumers (CLI / TUI).
//!
//! - **[`ConnectionManager`]**: Owns one backend connection: `open()`,
//!   `close()`, `refresh()`, bounded fixed-delay reconnect, and the
//!   [`ConnectionState`] machine. Runs as a single actor task; consumers
//!   only read its `watch`/`broadcast` channels.
//!
//! - **[`Normalizer`]**: Maps loosely-typed `update` payloads to a complete
//!   [`MetricsSnapshot`]. Never fails; malformed fields degrade to defaults.
//!
//! - **[`MetricsStore`]** / **[`SnapshotStream`]**: Atomically replaced
//!   snapshot with change notification for reactive rendering.
//!
//! - **[`SimulationCommand`]**: Start, pause, reset and playback speed
//!   control sent through the live session.

pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod normalize;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BackendConfig, DEFAULT_BACKEND_URL, ReconnectPolicy};
pub use error::CoreError;
pub use manager::ConnectionManager;
pub use model::{
    ConnectionState, MetricsSnapshot, PlaybackSpeed, ReconnectStatus, SimulationCommand,
    StateTransition,
};
pub use normalize::Normalizer;
pub use store::MetricsStore;
pub use stream::{SnapshotStream, SnapshotWatchStream};

// Transport-level types needed to plug in a custom transport.
pub use vegha_api::{
    BackendClient, EventSink, NetworkBounds, OutboundEvent, SessionId, Transport, TransportEvent,
};
