//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default matching the reference tuning of the boat, so an
//! empty file (or a missing section) is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{HelmError, Result};

/// Highest BCM GPIO number exposed on the Raspberry Pi header.
const MAX_GPIO_PIN: u8 = 27;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub autonomy_link: AutonomyLinkConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub actuators: ActuatorConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link to the autonomy computer
#[derive(Debug, Deserialize, Clone)]
pub struct AutonomyLinkConfig {
    #[serde(default = "default_autonomy_port")]
    pub port: String,

    #[serde(default = "default_autonomy_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Serial link to the indicator tower
#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorConfig {
    #[serde(default = "default_indicator_port")]
    pub port: String,

    #[serde(default = "default_indicator_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

/// RC receiver input pins (BCM numbering)
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    #[serde(default = "default_throttle_pin")]
    pub throttle_pin: u8,

    #[serde(default = "default_elevation_pin")]
    pub elevation_pin: u8,

    #[serde(default = "default_aileron_pin")]
    pub aileron_pin: u8,

    #[serde(default = "default_rudder_pin")]
    pub rudder_pin: u8,

    #[serde(default = "default_source_select_pin")]
    pub source_select_pin: u8,

    #[serde(default = "default_remote_stop_pin")]
    pub remote_stop_pin: u8,

    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
}

/// Servo and ESC output pins and pulse calibration
#[derive(Debug, Deserialize, Clone)]
pub struct ActuatorConfig {
    #[serde(default = "default_front_servo_pin")]
    pub front_servo_pin: u8,

    #[serde(default = "default_back_servo_pin")]
    pub back_servo_pin: u8,

    #[serde(default = "default_front_thrust_pin")]
    pub front_thrust_pin: u8,

    #[serde(default = "default_back_thrust_pin")]
    pub back_thrust_pin: u8,

    #[serde(default = "default_pwm_period_ms")]
    pub pwm_period_ms: u64,

    #[serde(default = "default_servo_range_us")]
    pub servo_range_us: u64,

    #[serde(default = "default_esc_range_us")]
    pub esc_range_us: u64,
}

/// Safety interlock tuning
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    #[serde(default = "default_estop_pin")]
    pub estop_pin: u8,

    #[serde(default = "default_threshold")]
    pub remote_stop_threshold: f32,

    #[serde(default = "default_threshold")]
    pub source_select_threshold: f32,

    #[serde(default = "default_autonomy_timeout_ms")]
    pub autonomy_timeout_ms: u64,

    #[serde(default = "default_thrust_trim")]
    pub thrust_trim: f32,

    #[serde(default = "default_thrust_still")]
    pub thrust_still: f32,

    #[serde(default = "default_thruster_band_min")]
    pub thruster_band_min: f32,

    #[serde(default = "default_thruster_band_max")]
    pub thruster_band_max: f32,

    #[serde(default = "default_rc_front_steer")]
    pub rc_front_steer: f32,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_loop_rate_hz")]
    pub loop_rate_hz: u32,

    #[serde(default = "default_calibration_dwell_ms")]
    pub calibration_dwell_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file. Stdout only when unset.
    #[serde(default)]
    pub file_dir: Option<String>,
}

// Default value functions
fn default_autonomy_port() -> String { "/dev/ttyACM0".to_string() }
fn default_autonomy_baud_rate() -> u32 { 115200 }
fn default_max_message_len() -> usize { 100 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_indicator_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_indicator_baud_rate() -> u32 { 9600 }
fn default_update_interval_ms() -> u64 { 500 }

fn default_throttle_pin() -> u8 { 17 }
fn default_elevation_pin() -> u8 { 27 }
fn default_aileron_pin() -> u8 { 22 }
fn default_rudder_pin() -> u8 { 23 }
fn default_source_select_pin() -> u8 { 24 }
fn default_remote_stop_pin() -> u8 { 25 }
fn default_signal_timeout_ms() -> u64 { 100 }

fn default_front_servo_pin() -> u8 { 12 }
fn default_back_servo_pin() -> u8 { 13 }
fn default_front_thrust_pin() -> u8 { 18 }
fn default_back_thrust_pin() -> u8 { 19 }
fn default_pwm_period_ms() -> u64 { 20 }
fn default_servo_range_us() -> u64 { 850 }
fn default_esc_range_us() -> u64 { 500 }

fn default_estop_pin() -> u8 { 4 }
fn default_threshold() -> f32 { 0.5 }
fn default_autonomy_timeout_ms() -> u64 { 1500 }
fn default_thrust_trim() -> f32 { -0.04 }
fn default_thrust_still() -> f32 { 0.46 }
fn default_thruster_band_min() -> f32 { 0.08 }
fn default_thruster_band_max() -> f32 { 0.92 }
fn default_rc_front_steer() -> f32 { 0.5 }

fn default_loop_rate_hz() -> u32 { 200 }
fn default_calibration_dwell_ms() -> u64 { 100 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for AutonomyLinkConfig {
    fn default() -> Self {
        Self {
            port: default_autonomy_port(),
            baud_rate: default_autonomy_baud_rate(),
            max_message_len: default_max_message_len(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            port: default_indicator_port(),
            baud_rate: default_indicator_baud_rate(),
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            throttle_pin: default_throttle_pin(),
            elevation_pin: default_elevation_pin(),
            aileron_pin: default_aileron_pin(),
            rudder_pin: default_rudder_pin(),
            source_select_pin: default_source_select_pin(),
            remote_stop_pin: default_remote_stop_pin(),
            signal_timeout_ms: default_signal_timeout_ms(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            front_servo_pin: default_front_servo_pin(),
            back_servo_pin: default_back_servo_pin(),
            front_thrust_pin: default_front_thrust_pin(),
            back_thrust_pin: default_back_thrust_pin(),
            pwm_period_ms: default_pwm_period_ms(),
            servo_range_us: default_servo_range_us(),
            esc_range_us: default_esc_range_us(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            estop_pin: default_estop_pin(),
            remote_stop_threshold: default_threshold(),
            source_select_threshold: default_threshold(),
            autonomy_timeout_ms: default_autonomy_timeout_ms(),
            thrust_trim: default_thrust_trim(),
            thrust_still: default_thrust_still(),
            thruster_band_min: default_thruster_band_min(),
            thruster_band_max: default_thruster_band_max(),
            rc_front_steer: default_rc_front_steer(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: default_loop_rate_hz(),
            calibration_dwell_ms: default_calibration_dwell_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl AutonomyLinkConfig {
    /// Wait between attempts to reopen the autonomy serial port
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl SafetyConfig {
    /// Autonomy staleness budget as a wall-clock duration
    pub fn autonomy_timeout(&self) -> Duration {
        Duration::from_millis(self.autonomy_timeout_ms)
    }
}

impl ControlConfig {
    /// Period of one control cycle
    pub fn cycle_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.loop_rate_hz.max(1)))
    }
}

fn invalid(msg: impl std::fmt::Display) -> HelmError {
    HelmError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vessel_helm::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial links
        if self.autonomy_link.port.is_empty() {
            return Err(invalid("autonomy_link port cannot be empty"));
        }

        if self.indicator.port.is_empty() {
            return Err(invalid("indicator port cannot be empty"));
        }

        const BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];
        for (name, baud) in [
            ("autonomy_link baud_rate", self.autonomy_link.baud_rate),
            ("indicator baud_rate", self.indicator.baud_rate),
        ] {
            if !BAUD_RATES.contains(&baud) {
                return Err(invalid(format!(
                    "{} must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
                    name
                )));
            }
        }

        if self.autonomy_link.max_message_len == 0 || self.autonomy_link.max_message_len > 1024 {
            return Err(invalid("max_message_len must be between 1 and 1024"));
        }

        if self.autonomy_link.reconnect_interval_ms < 100 {
            return Err(invalid("reconnect_interval_ms must be at least 100"));
        }

        // The tower must never be refreshed faster than 2 Hz
        if self.indicator.update_interval_ms < 500 {
            return Err(invalid("indicator update_interval_ms must be at least 500"));
        }

        if self.receiver.signal_timeout_ms == 0 || self.receiver.signal_timeout_ms > 1000 {
            return Err(invalid("signal_timeout_ms must be between 1 and 1000"));
        }

        // Pins
        let pins = [
            ("throttle_pin", self.receiver.throttle_pin),
            ("elevation_pin", self.receiver.elevation_pin),
            ("aileron_pin", self.receiver.aileron_pin),
            ("rudder_pin", self.receiver.rudder_pin),
            ("source_select_pin", self.receiver.source_select_pin),
            ("remote_stop_pin", self.receiver.remote_stop_pin),
            ("front_servo_pin", self.actuators.front_servo_pin),
            ("back_servo_pin", self.actuators.back_servo_pin),
            ("front_thrust_pin", self.actuators.front_thrust_pin),
            ("back_thrust_pin", self.actuators.back_thrust_pin),
            ("estop_pin", self.safety.estop_pin),
        ];
        let mut seen = HashSet::new();
        for (name, pin) in pins {
            if pin > MAX_GPIO_PIN {
                return Err(invalid(format!("{} {} is out of range (0-{})", name, pin, MAX_GPIO_PIN)));
            }
            if !seen.insert(pin) {
                return Err(invalid(format!("{} {} is assigned more than once", name, pin)));
            }
        }

        // Pulse calibration
        if self.actuators.pwm_period_ms < 5 || self.actuators.pwm_period_ms > 50 {
            return Err(invalid("pwm_period_ms must be between 5 and 50"));
        }

        for (name, range) in [
            ("servo_range_us", self.actuators.servo_range_us),
            ("esc_range_us", self.actuators.esc_range_us),
        ] {
            if range == 0 || range > 1000 {
                return Err(invalid(format!("{} must be between 1 and 1000", name)));
            }
        }

        // Safety tuning
        for (name, value) in [
            ("remote_stop_threshold", self.safety.remote_stop_threshold),
            ("source_select_threshold", self.safety.source_select_threshold),
            ("thrust_still", self.safety.thrust_still),
            ("thruster_band_min", self.safety.thruster_band_min),
            ("thruster_band_max", self.safety.thruster_band_max),
            ("rc_front_steer", self.safety.rc_front_steer),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{} must be between 0.0 and 1.0", name)));
            }
        }

        if self.safety.thruster_band_min >= self.safety.thruster_band_max {
            return Err(invalid("thruster_band_min must be less than thruster_band_max"));
        }

        if !(-0.5..=0.5).contains(&self.safety.thrust_trim) {
            return Err(invalid("thrust_trim must be between -0.5 and 0.5"));
        }

        if self.safety.autonomy_timeout_ms == 0 || self.safety.autonomy_timeout_ms > 60000 {
            return Err(invalid("autonomy_timeout_ms must be between 1 and 60000"));
        }

        // Control loop
        if self.control.loop_rate_hz < 10 || self.control.loop_rate_hz > 1000 {
            return Err(invalid("loop_rate_hz must be between 10 and 1000"));
        }

        if self.control.calibration_dwell_ms < 50 {
            return Err(invalid("calibration_dwell_ms must be at least 50"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}
