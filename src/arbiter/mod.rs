//! # Safety Arbiter
//!
//! Decides, once per control cycle, which command source drives the vessel.
//!
//! This module handles:
//! - Priority-ordered mode selection ([`mode`])
//! - Autonomy staleness tracking ([`freshness`])
//! - Turning the selected mode into actuator setpoints and an indicator state
//!
//! The arbiter owns no I/O. Callers sample the inputs, pass them to
//! [`Arbiter::cycle`] and forward the returned [`Decision`].

pub mod freshness;
pub mod mode;

pub use freshness::FreshnessTracker;
pub use mode::{select_mode, AutonomyStatus, Mode, StopCause, Thresholds};

use std::time::Duration;
use tokio::time::Instant;

use crate::actuator::ActuatorCommand;
use crate::config::SafetyConfig;
use crate::indicator::IndicatorState;
use crate::input::{RcSnapshot, SafetyInputs};
use crate::link::AutonomyCommand;

/// Effective operating band of the thrust ESCs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrusterBand {
    pub min: f32,
    pub max: f32,
}

impl Default for ThrusterBand {
    fn default() -> Self {
        Self { min: 0.08, max: 0.92 }
    }
}

/// Maps a 0.0–1.0 thrust request onto the ESC operating band.
///
/// # Examples
///
/// ```
/// use vessel_helm::arbiter::{thruster_range, ThrusterBand};
///
/// let band = ThrusterBand::default();
/// assert!((thruster_range(0.0, &band) - 0.08).abs() < 1e-6);
/// assert!((thruster_range(1.0, &band) - 0.92).abs() < 1e-6);
/// ```
#[inline]
#[must_use]
pub fn thruster_range(x: f32, band: &ThrusterBand) -> f32 {
    band.min + x * (band.max - band.min)
}

/// Tuning used by the arbiter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbiterConfig {
    pub thresholds: Thresholds,
    pub autonomy_timeout: Duration,
    /// Offset added to both thrust channels in RC and auto modes
    pub thrust_trim: f32,
    /// Thrust setpoint that keeps the propellers still
    pub thrust_still: f32,
    pub band: ThrusterBand,
    /// Front pod position while under RC control
    pub rc_front_steer: f32,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self::from(&SafetyConfig::default())
    }
}

impl From<&SafetyConfig> for ArbiterConfig {
    fn from(safety: &SafetyConfig) -> Self {
        Self {
            thresholds: Thresholds {
                remote_stop: safety.remote_stop_threshold,
                source_select: safety.source_select_threshold,
            },
            autonomy_timeout: safety.autonomy_timeout(),
            thrust_trim: safety.thrust_trim,
            thrust_still: safety.thrust_still,
            band: ThrusterBand {
                min: safety.thruster_band_min,
                max: safety.thruster_band_max,
            },
            rc_front_steer: safety.rc_front_steer,
        }
    }
}

/// Result of one arbitration cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub mode: Mode,
    /// Raw setpoints, before output-stage clamping
    pub command: ActuatorCommand,
    pub indicator: IndicatorState,
}

/// The command arbitration state machine.
///
/// Carries exactly two pieces of state between cycles: autonomy freshness
/// and the last commanded actuator position (held by steering outputs while
/// stopped).
#[derive(Debug, Clone)]
pub struct Arbiter {
    config: ArbiterConfig,
    freshness: FreshnessTracker,
    latest: Option<AutonomyCommand>,
    last_command: ActuatorCommand,
}

impl Arbiter {
    /// Creates an arbiter whose held position is the post-calibration
    /// neutral.
    #[must_use]
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            freshness: FreshnessTracker::new(config.autonomy_timeout),
            latest: None,
            last_command: ActuatorCommand::neutral(config.thrust_still),
            config,
        }
    }

    /// Runs one cycle.
    ///
    /// `new_command` is the autonomy command that arrived since the previous
    /// cycle, if any. It refreshes staleness tracking whatever the current
    /// mode.
    pub fn cycle(
        &mut self,
        rc: &RcSnapshot,
        inputs: &SafetyInputs,
        new_command: Option<AutonomyCommand>,
        now: Instant,
    ) -> Decision {
        if let Some(command) = new_command {
            self.latest = Some(command);
        }
        self.freshness.record_cycle(new_command.is_some(), now);

        let status = match self.latest {
            Some(_) => self.freshness.status(now),
            None => AutonomyStatus::Stale,
        };
        let mode = select_mode(inputs, status, &self.config.thresholds);

        let command = match (mode, self.latest) {
            (Mode::Rc, _) => self.rc_command(rc),
            (Mode::AutoFresh, Some(autonomy)) => self.auto_command(&autonomy),
            _ => self.last_command.with_thrust(self.config.thrust_still),
        };
        self.last_command = command;

        Decision {
            mode,
            command,
            indicator: mode.indicator(),
        }
    }

    fn rc_command(&self, rc: &RcSnapshot) -> ActuatorCommand {
        ActuatorCommand {
            front_steer: self.config.rc_front_steer,
            front_thrust: rc.aileron + self.config.thrust_trim,
            back_steer: rc.rudder,
            back_thrust: rc.elevation + self.config.thrust_trim,
        }
    }

    fn auto_command(&self, autonomy: &AutonomyCommand) -> ActuatorCommand {
        let band = &self.config.band;
        ActuatorCommand {
            front_steer: autonomy.front_steer,
            front_thrust: thruster_range(autonomy.front_thrust, band) + self.config.thrust_trim,
            back_steer: autonomy.back_steer,
            back_thrust: thruster_range(autonomy.back_thrust, band) + self.config.thrust_trim,
        }
    }

    #[must_use]
    pub fn freshness(&self) -> &FreshnessTracker {
        &self.freshness
    }

    /// Setpoints decided on the previous cycle
    #[must_use]
    pub fn last_command(&self) -> ActuatorCommand {
        self.last_command
    }

    #[must_use]
    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }
}
