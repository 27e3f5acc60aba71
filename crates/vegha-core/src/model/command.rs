// ── Simulation control ──

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use vegha_api::OutboundEvent;

use crate::error::CoreError;

/// Playback speed multiplier in half steps: 0.5x, 1.0x, … 3.0x.
///
/// Stored as the number of half steps so equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaybackSpeed(u8);

impl PlaybackSpeed {
    const MIN_STEPS: u8 = 1;
    const MAX_STEPS: u8 = 6;

    pub const SLOWEST: Self = Self(Self::MIN_STEPS);
    pub const FASTEST: Self = Self(Self::MAX_STEPS);

    /// Validate a multiplier; it must be a multiple of 0.5 in `[0.5, 3.0]`.
    pub fn from_multiplier(multiplier: f64) -> Result<Self, CoreError> {
        let raw = multiplier * 2.0;
        let steps = raw.round();
        let in_range = (f64::from(Self::MIN_STEPS)..=f64::from(Self::MAX_STEPS)).contains(&steps);
        if !raw.is_finite() || (raw - steps).abs() > f64::EPSILON || !in_range {
            return Err(invalid_speed(multiplier));
        }
        // Integral and within 1..=6 after the checks above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let steps = steps as u8;
        Ok(Self(steps))
    }

    pub fn multiplier(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    /// The next speed on the dashboard's speed button; wraps from 3.0x to 0.5x.
    #[must_use]
    pub fn next(self) -> Self {
        if self.0 >= Self::MAX_STEPS {
            Self::SLOWEST
        } else {
            Self(self.0 + 1)
        }
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(2)
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

fn invalid_speed(multiplier: f64) -> CoreError {
    CoreError::InvalidCommand {
        message: format!("speed must be a multiple of 0.5 between 0.5 and 3, got {multiplier}"),
    }
}

/// Control events understood by the simulation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationCommand {
    Start,
    Pause,
    Reset,
    Speed(PlaybackSpeed),
}

impl SimulationCommand {
    /// Wire event name.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Reset => "reset",
            Self::Speed(_) => "speed",
        }
    }

    pub fn to_outbound(self) -> OutboundEvent {
        let event = OutboundEvent::new(self.event_name());
        match self {
            Self::Speed(speed) => event.with_payload(json!({ "speed": speed.multiplier() })),
            Self::Start | Self::Pause | Self::Reset => event,
        }
    }
}
