//! # Actuator Output Stage
//!
//! Last stop before the drivers: every setpoint is forced into the driver's
//! accepted 0.0–1.0 range. Out-of-range values are clamped, never rejected,
//! and a non-finite value falls back to that channel's neutral.

use tracing::warn;

use super::{ActuatorChannel, ActuatorCommand, ActuatorDriver};
use crate::error::Result;

/// Clamps one setpoint, substituting `fallback` for NaN or infinity.
#[inline]
#[must_use]
pub fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Clamps every channel of `command`, using `neutral` for non-finite values.
#[must_use]
pub fn clamp_command(command: &ActuatorCommand, neutral: &ActuatorCommand) -> ActuatorCommand {
    ActuatorCommand {
        front_steer: sanitize(command.front_steer, neutral.front_steer),
        front_thrust: sanitize(command.front_thrust, neutral.front_thrust),
        back_steer: sanitize(command.back_steer, neutral.back_steer),
        back_thrust: sanitize(command.back_thrust, neutral.back_thrust),
    }
}

/// Calibrated actuator outputs.
///
/// Only [`Uncalibrated::calibrate`](super::Uncalibrated::calibrate) can build
/// one, so holding an `OutputStage` proves the arming sequence has run.
#[derive(Debug)]
pub struct OutputStage<A: ActuatorDriver> {
    driver: A,
    neutral: ActuatorCommand,
}

impl<A: ActuatorDriver> OutputStage<A> {
    pub(super) fn new(driver: A, neutral: ActuatorCommand) -> Self {
        Self { driver, neutral }
    }

    /// Clamps `command` and writes all four channels.
    ///
    /// Every channel is attempted even if an earlier write fails.
    ///
    /// # Returns
    ///
    /// * `Result<ActuatorCommand>` - The command actually written
    ///
    /// # Errors
    ///
    /// Returns the first driver error encountered.
    pub fn apply(&mut self, command: &ActuatorCommand) -> Result<ActuatorCommand> {
        let clamped = clamp_command(command, &self.neutral);
        let mut first_error = None;

        for channel in ActuatorChannel::ALL {
            if let Err(e) = self.driver.write(channel, clamped.get(channel)) {
                warn!("Failed to write {:?}: {}", channel, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(clamped),
        }
    }

    /// Neutral command this stage settled to after calibration
    #[cfg(test)]
    pub(crate) fn neutral(&self) -> ActuatorCommand {
        self.neutral
    }
}
