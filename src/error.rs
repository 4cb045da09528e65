//! # Error Types
//!
//! Custom error types for Vessel Helm using `thiserror`.

use thiserror::Error;

/// Main error type for Vessel Helm
#[derive(Debug, Error)]
pub enum HelmError {
    /// Autonomy link framing errors
    #[error("Autonomy link protocol error: {0}")]
    LinkProtocol(String),

    /// Indicator tower frame errors
    #[error("Indicator protocol error: {0}")]
    IndicatorProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// GPIO errors
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// Actuator driver errors
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Telemetry logging errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type alias for Vessel Helm
pub type Result<T> = std::result::Result<T, HelmError>;
