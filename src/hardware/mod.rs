//! # Hardware Module
//!
//! Raspberry Pi implementations of the input and actuator boundaries.
//!
//! This module handles:
//! - Mapping 0.0–1.0 actuator setpoints to servo and ESC pulse widths
//! - Software PWM outputs, the E-stop input pin and receiver pulse
//!   measurement on GPIO ([`rpi`])

pub mod rpi;

pub use rpi::{RpiActuators, RpiEstopButton, RpiPulseInput};

use std::time::Duration;

use crate::actuator::ActuatorChannel;
use crate::config::ActuatorConfig;

/// Pulse width at a 0.5 setpoint
pub const PULSE_CENTER: Duration = Duration::from_micros(1500);

/// Pulse timing for the four actuator outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseMapping {
    /// PWM period (20 ms for standard servos and ESCs)
    pub period: Duration,
    /// Half-travel of the steering servos either side of center
    pub servo_range: Duration,
    /// Half-travel of the ESCs either side of center
    pub esc_range: Duration,
}

impl Default for PulseMapping {
    fn default() -> Self {
        Self::from_config(&ActuatorConfig::default())
    }
}

impl PulseMapping {
    #[must_use]
    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self {
            period: Duration::from_millis(config.pwm_period_ms),
            servo_range: Duration::from_micros(config.servo_range_us),
            esc_range: Duration::from_micros(config.esc_range_us),
        }
    }

    /// Pulse width for `value` on `channel`.
    ///
    /// `center + (2 * value - 1) * range`, with `value` clamped to 0.0–1.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use vessel_helm::actuator::ActuatorChannel;
    /// use vessel_helm::hardware::PulseMapping;
    ///
    /// let mapping = PulseMapping::default();
    /// assert_eq!(mapping.pulse_for(ActuatorChannel::FrontThrust, 1.0), Duration::from_micros(2000));
    /// assert_eq!(mapping.pulse_for(ActuatorChannel::FrontServo, 0.0), Duration::from_micros(650));
    /// ```
    #[must_use]
    pub fn pulse_for(&self, channel: ActuatorChannel, value: f32) -> Duration {
        let range = if channel.is_servo() {
            self.servo_range
        } else {
            self.esc_range
        };
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.5 };

        let center_us = PULSE_CENTER.as_micros() as f64;
        let offset_us = (2.0 * f64::from(value) - 1.0) * range.as_micros() as f64;
        Duration::from_micros((center_us + offset_us).round().max(0.0) as u64)
    }
}
