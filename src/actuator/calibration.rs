//! # Startup Calibration
//!
//! ESC arming ritual run once at power-on: every output is driven to its
//! minimum, maximum and minimum again with a dwell after each step so the
//! ESCs can learn their signal range, then everything settles to neutral.
//!
//! The sequence consumes an [`Uncalibrated`] driver and is the only way to
//! obtain an [`OutputStage`], so it cannot be skipped or run twice.

use std::time::Duration;
use tracing::{debug, info};

use super::output::OutputStage;
use super::{ActuatorChannel, ActuatorCommand, ActuatorDriver};
use crate::config::Config;
use crate::error::Result;

/// Levels visited by the sweep, in order
pub const CALIBRATION_LEVELS: [f32; 3] = [0.0, 1.0, 0.0];

/// Default dwell after each sweep step
pub const DEFAULT_DWELL: Duration = Duration::from_millis(100);

/// Timing and final position of the calibration sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSequence {
    pub dwell: Duration,
    pub neutral: ActuatorCommand,
}

impl CalibrationSequence {
    #[must_use]
    pub fn new(dwell: Duration, neutral: ActuatorCommand) -> Self {
        Self { dwell, neutral }
    }

    /// Dwell from `[control]`, neutral thrust from `[safety]`
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.control.calibration_dwell_ms),
            ActuatorCommand::neutral(config.safety.thrust_still),
        )
    }
}

/// Actuator driver that has not been armed yet
#[derive(Debug)]
pub struct Uncalibrated<A: ActuatorDriver> {
    driver: A,
}

impl<A: ActuatorDriver> Uncalibrated<A> {
    #[must_use]
    pub fn new(driver: A) -> Self {
        Self { driver }
    }

    /// Runs the sweep and settles at neutral.
    ///
    /// Blocks the calling task for three dwell periods.
    ///
    /// # Errors
    ///
    /// Returns the first driver error; the sweep is abandoned.
    pub async fn calibrate(mut self, sequence: &CalibrationSequence) -> Result<OutputStage<A>> {
        info!("Calibrating actuators ({:?} dwell)", sequence.dwell);

        for level in CALIBRATION_LEVELS {
            debug!("Calibration step: all outputs at {}", level);
            self.write_all(&ActuatorCommand::uniform(level))?;
            tokio::time::sleep(sequence.dwell).await;
        }

        self.write_all(&sequence.neutral)?;
        info!("Actuators armed and settled at neutral");

        Ok(OutputStage::new(self.driver, sequence.neutral))
    }

    fn write_all(&mut self, command: &ActuatorCommand) -> Result<()> {
        for channel in ActuatorChannel::ALL {
            self.driver.write(channel, command.get(channel))?;
        }
        Ok(())
    }
}
