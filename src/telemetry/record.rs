//! Telemetry record layout.

use serde::Serialize;
use std::time::Duration;

use crate::arbiter::Decision;

/// Why a record was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Regular sample at the configured interval
    Periodic,
    /// First cycle in a new mode
    ModeChange,
}

/// One line of the telemetry log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// RFC 3339, UTC
    pub timestamp: String,
    pub event: TelemetryEvent,
    pub mode: &'static str,
    pub indicator_color: u8,
    pub indicator_brightness: f32,
    pub front_steer: f32,
    pub front_thrust: f32,
    pub back_steer: f32,
    pub back_thrust: f32,
    /// Control cycles since the last autonomy command
    pub autonomy_cycles: u64,
    /// Milliseconds since the last autonomy command, `null` if none yet
    pub autonomy_age_ms: Option<u64>,
}

impl TelemetryRecord {
    /// Captures `decision` with the current wall-clock time.
    #[must_use]
    pub fn new(
        event: TelemetryEvent,
        decision: &Decision,
        autonomy_cycles: u64,
        autonomy_age: Option<Duration>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            event,
            mode: decision.mode.name(),
            indicator_color: decision.indicator.color.code(),
            indicator_brightness: decision.indicator.brightness,
            front_steer: decision.command.front_steer,
            front_thrust: decision.command.front_thrust,
            back_steer: decision.command.back_steer,
            back_thrust: decision.command.back_thrust,
            autonomy_cycles,
            autonomy_age_ms: autonomy_age.map(|age| age.as_millis() as u64),
        }
    }
}
