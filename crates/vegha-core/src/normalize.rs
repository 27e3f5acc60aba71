// ── Metrics normalization ──
//
// Turns a loosely-shaped `update` payload into a complete MetricsSnapshot.
// Normalization never fails: a missing, mistyped, negative or non-finite
// field degrades to its default, and unknown fields are ignored.

use serde_json::Value;

use crate::model::MetricsSnapshot;

/// Payload keys as the backend sends them.
mod keys {
    pub const VEHICLES: &str = "vehicles";
    pub const AVG_SPEED: &str = "avg_speed";
    pub const WAITING: &str = "waiting";
    pub const TIME: &str = "time";
    pub const TRAFFIC_LIGHTS: &str = "traffic_lights";
    pub const AVG_WAIT_TIME: &str = "avg_wait_time";
    pub const CONGESTION_PERCENT: &str = "congestion_percent";
}

/// Maps raw update payloads to [`MetricsSnapshot`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    static_signal_count: Option<u64>,
}

impl Normalizer {
    /// `static_signal_count` is reported as `signals` whenever the payload
    /// has no usable `traffic_lights` mapping.
    pub fn new(static_signal_count: Option<u64>) -> Self {
        Self {
            static_signal_count,
        }
    }

    /// The snapshot shown before any update arrives, and after stale data
    /// is discarded.
    pub fn defaults(&self) -> MetricsSnapshot {
        MetricsSnapshot::with_signals(self.static_signal_count.unwrap_or(0))
    }

    pub fn normalize(&self, payload: &Value) -> MetricsSnapshot {
        let defaults = self.defaults();

        MetricsSnapshot {
            vehicle_count: key_count(payload.get(keys::VEHICLES)).unwrap_or(0),
            avg_speed: non_negative(payload.get(keys::AVG_SPEED)).unwrap_or(0.0),
            waiting: whole(payload.get(keys::WAITING)).unwrap_or(0),
            sim_time: non_negative(payload.get(keys::TIME)).unwrap_or(0.0),
            signals: key_count(payload.get(keys::TRAFFIC_LIGHTS)).unwrap_or(defaults.signals),
            avg_wait_time: non_negative(payload.get(keys::AVG_WAIT_TIME)).unwrap_or(0.0),
            congestion_percent: non_negative(payload.get(keys::CONGESTION_PERCENT))
                .map_or(0.0, |p| p.min(100.0)),
        }
    }
}

/// A finite, non-negative JSON number.
fn non_negative(value: Option<&Value>) -> Option<f64> {
    value?
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// A non-negative count. Fractional values are truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn whole(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    // Finite and non-negative here; the cast saturates at u64::MAX.
    non_negative(Some(value)).map(|v| v.trunc() as u64)
}

/// Number of keys in a mapping-shaped field.
fn key_count(value: Option<&Value>) -> Option<u64> {
    value?
        .as_object()
        .map(|map| u64::try_from(map.len()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn counts_mappings_and_defaults_the_rest() {
        let payload = json!({
            "vehicles": { "a": 1, "b": 2 },
            "avg_speed": 42,
            "traffic_lights": {},
        });

        let snap = Normalizer::default().normalize(&payload);

        assert_eq!(
            snap,
            MetricsSnapshot {
                vehicle_count: 2,
                avg_speed: 42.0,
                signals: 0,
                ..MetricsSnapshot::default()
            }
        );
    }

    #[test]
    fn full_backend_payload() {
        let payload = json!({
            "vehicles": {
                "veh0": { "pos": [13.40, 52.52], "angle": 90.0, "type": "passenger" },
                "veh1": { "pos": [13.41, 52.52], "angle": 0.0, "type": "bus" },
                "veh2": { "pos": [13.42, 52.53], "angle": 180.0, "type": "truck" },
            },
            "traffic_lights": {
                "j1": { "pos": [13.40, 52.52], "state": "green", "angle": 45.0 },
            },
            "time": 118,
            "avg_speed": 27,
            "waiting": 1,
            "avg_wait_time": 4.5,
            "congestion_percent": 37.5,
        });

        let snap = Normalizer::default().normalize(&payload);

        assert_eq!(
            snap,
            MetricsSnapshot {
                vehicle_count: 3,
                avg_speed: 27.0,
                waiting: 1,
                sim_time: 118.0,
                signals: 1,
                avg_wait_time: 4.5,
                congestion_percent: 37.5,
            }
        );
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let payload = json!({
            "vehicles": ["a", "b"],
            "avg_speed": "fast",
            "waiting": -3,
            "time": null,
            "traffic_lights": 7,
            "avg_wait_time": { "s": 1 },
            "congestion_percent": true,
            "unrelated": "ignored",
        });

        let snap = Normalizer::default().normalize(&payload);

        assert_eq!(snap, MetricsSnapshot::default());
    }

    #[test]
    fn non_object_payloads_yield_defaults() {
        let normalizer = Normalizer::default();
        for payload in [json!(null), json!(42), json!("update"), json!([1, 2, 3])] {
            assert_eq!(normalizer.normalize(&payload), MetricsSnapshot::default());
        }
    }

    #[test]
    fn static_signal_count_fills_missing_traffic_lights() {
        let normalizer = Normalizer::new(Some(12));

        assert_eq!(normalizer.defaults().signals, 12);
        assert_eq!(normalizer.normalize(&json!({})).signals, 12);
        assert_eq!(normalizer.normalize(&json!({"traffic_lights": "x"})).signals, 12);
        // A real mapping wins, even an empty one.
        assert_eq!(normalizer.normalize(&json!({"traffic_lights": {}})).signals, 0);
    }

    #[test]
    fn fractional_counts_truncate_and_percent_clamps() {
        let snap = Normalizer::default().normalize(&json!({
            "waiting": 4.9,
            "congestion_percent": 250,
        }));

        assert_eq!(snap.waiting, 4);
        assert!((snap.congestion_percent - 100.0).abs() < f64::EPSILON);
    }
}
