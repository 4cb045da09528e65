//! # Actuator Module
//!
//! Steering servos and thrust ESCs.
//!
//! This module handles:
//! - The [`ActuatorCommand`] setpoint record produced by the arbiter
//! - The [`ActuatorDriver`] boundary to the PWM hardware
//! - Final range enforcement before anything reaches a driver
//! - The one-shot startup calibration that arms the ESCs

pub mod calibration;
pub mod output;

pub use calibration::{CalibrationSequence, Uncalibrated};
pub use output::OutputStage;

use crate::error::Result;

/// Neutral steering position (pods pointing straight ahead)
pub const STEER_CENTER: f32 = 0.5;

/// The four actuator outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorChannel {
    FrontServo,
    FrontThrust,
    BackServo,
    BackThrust,
}

impl ActuatorChannel {
    /// All outputs in write order
    pub const ALL: [ActuatorChannel; 4] = [
        ActuatorChannel::FrontServo,
        ActuatorChannel::FrontThrust,
        ActuatorChannel::BackServo,
        ActuatorChannel::BackThrust,
    ];

    /// Steering servo (as opposed to a thrust ESC)
    #[must_use]
    pub fn is_servo(self) -> bool {
        matches!(self, ActuatorChannel::FrontServo | ActuatorChannel::BackServo)
    }
}

/// Setpoints for all four actuators, each nominally in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCommand {
    pub front_steer: f32,
    pub front_thrust: f32,
    pub back_steer: f32,
    pub back_thrust: f32,
}

impl ActuatorCommand {
    /// Steering centered, thrusters at `thrust_still`
    #[must_use]
    pub fn neutral(thrust_still: f32) -> Self {
        Self {
            front_steer: STEER_CENTER,
            front_thrust: thrust_still,
            back_steer: STEER_CENTER,
            back_thrust: thrust_still,
        }
    }

    /// Same steering, both thrusters set to `thrust`
    #[must_use]
    pub fn with_thrust(self, thrust: f32) -> Self {
        Self {
            front_thrust: thrust,
            back_thrust: thrust,
            ..self
        }
    }

    /// Every channel set to `value` (used by the calibration sweep)
    #[must_use]
    pub fn uniform(value: f32) -> Self {
        Self {
            front_steer: value,
            front_thrust: value,
            back_steer: value,
            back_thrust: value,
        }
    }

    /// Setpoint for one channel
    #[must_use]
    pub fn get(&self, channel: ActuatorChannel) -> f32 {
        match channel {
            ActuatorChannel::FrontServo => self.front_steer,
            ActuatorChannel::FrontThrust => self.front_thrust,
            ActuatorChannel::BackServo => self.back_steer,
            ActuatorChannel::BackThrust => self.back_thrust,
        }
    }
}

/// PWM driver for the four actuator outputs.
///
/// `value` is a duty-equivalent command in 0.0–1.0; the driver owns the
/// mapping to pulse widths.
#[cfg_attr(test, mockall::automock)]
pub trait ActuatorDriver: Send {
    /// Sets one output
    fn write(&mut self, channel: ActuatorChannel, value: f32) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral() {
        let cmd = ActuatorCommand::neutral(0.46);
        assert_eq!(cmd.front_steer, 0.5);
        assert_eq!(cmd.back_steer, 0.5);
        assert_eq!(cmd.front_thrust, 0.46);
        assert_eq!(cmd.back_thrust, 0.46);
    }

    #[test]
    fn test_with_thrust_keeps_steering() {
        let cmd = ActuatorCommand {
            front_steer: 0.2,
            front_thrust: 0.9,
            back_steer: 0.7,
            back_thrust: 0.1,
        }
        .with_thrust(0.46);

        assert_eq!(cmd.front_steer, 0.2);
        assert_eq!(cmd.back_steer, 0.7);
        assert_eq!(cmd.front_thrust, 0.46);
        assert_eq!(cmd.back_thrust, 0.46);
    }

    #[test]
    fn test_get_by_channel() {
        let cmd = ActuatorCommand {
            front_steer: 0.1,
            front_thrust: 0.2,
            back_steer: 0.3,
            back_thrust: 0.4,
        };
        assert_eq!(cmd.get(ActuatorChannel::FrontServo), 0.1);
        assert_eq!(cmd.get(ActuatorChannel::FrontThrust), 0.2);
        assert_eq!(cmd.get(ActuatorChannel::BackServo), 0.3);
        assert_eq!(cmd.get(ActuatorChannel::BackThrust), 0.4);
    }

    #[test]
    fn test_is_servo() {
        assert!(ActuatorChannel::FrontServo.is_servo());
        assert!(ActuatorChannel::BackServo.is_servo());
        assert!(!ActuatorChannel::FrontThrust.is_servo());
        assert!(!ActuatorChannel::BackThrust.is_servo());
    }
}
