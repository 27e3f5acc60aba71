// ── Domain model ──
//
// Everything the presentation layer reads: the connection state, the
// normalized metrics snapshot, and the simulation control vocabulary.

pub mod command;
pub mod connection;
pub mod metrics;

// ── Re-exports ──────────────────────────────────────────────────────

pub use command::{PlaybackSpeed, SimulationCommand};
pub use connection::{ConnectionState, ReconnectStatus, StateTransition};
pub use metrics::MetricsSnapshot;
