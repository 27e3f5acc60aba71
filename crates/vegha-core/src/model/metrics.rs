// ── Metrics snapshot ──

use serde::{Deserialize, Serialize};

/// Complete, normalized view of the live simulation metrics.
///
/// Never partially populated: every field holds either the backend's value
/// or its documented default. Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Vehicles currently in the network.
    pub vehicle_count: u64,
    /// Mean vehicle speed in km/h.
    pub avg_speed: f64,
    /// Vehicles standing still.
    pub waiting: u64,
    /// Simulation clock in seconds.
    pub sim_time: f64,
    /// Traffic-light controlled junctions.
    pub signals: u64,
    /// Mean waiting time in seconds.
    pub avg_wait_time: f64,
    /// Congestion level, 0–100.
    pub congestion_percent: f64,
}

impl MetricsSnapshot {
    /// Defaults with a configured static signal count.
    pub fn with_signals(signals: u64) -> Self {
        Self {
            signals,
            ..Self::default()
        }
    }
}
