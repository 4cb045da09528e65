//! # Indicator Tower Protocol
//!
//! Frame layout (10 bytes, sent as one burst):
//!
//! ```text
//! [0xFF header][0x00 message id][color: f32 LE][brightness: f32 LE]
//! ```
//!
//! Both values are IEEE-754 single precision in little-endian byte order.
//! Color is a whole-number code carried as a float; the tower treats any
//! unknown code as off.

use std::time::Duration;

/// Frame header marker
pub const INDICATOR_HEADER: u8 = 0xFF;

/// Message identifier for a color/brightness command
pub const INDICATOR_MSG_SET_LIGHT: u8 = 0x00;

/// Total frame length in bytes
pub const INDICATOR_FRAME_LEN: usize = 10;

/// Maximum brightness
pub const INDICATOR_BRIGHTNESS_MAX: f32 = 100.0;

/// Brightness used for the normal-operation colors
pub const INDICATOR_BRIGHTNESS_NORMAL: f32 = 75.0;

/// Minimum spacing between two frames
pub const INDICATOR_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Encoded tower frame
pub type IndicatorFrame = [u8; INDICATOR_FRAME_LEN];

/// Tower colors and their wire codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IndicatorColor {
    #[default]
    Off = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Yellow = 4,
    Purple = 5,
}

impl IndicatorColor {
    /// Wire code of this color
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Maps a received code back to a color. Unknown and fractional codes
    /// read as [`IndicatorColor::Off`], matching the tower's failsafe.
    #[must_use]
    pub fn from_code(code: f32) -> Self {
        if code.fract() != 0.0 {
            return IndicatorColor::Off;
        }
        match code as i32 {
            1 => IndicatorColor::Red,
            2 => IndicatorColor::Green,
            3 => IndicatorColor::Blue,
            4 => IndicatorColor::Yellow,
            5 => IndicatorColor::Purple,
            _ => IndicatorColor::Off,
        }
    }

    /// Lowercase color name for logs and telemetry
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            IndicatorColor::Off => "off",
            IndicatorColor::Red => "red",
            IndicatorColor::Green => "green",
            IndicatorColor::Blue => "blue",
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::Purple => "purple",
        }
    }
}

/// What the tower should show
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorState {
    pub color: IndicatorColor,
    /// 0.0–100.0
    pub brightness: f32,
}

impl IndicatorState {
    /// Tower dark
    pub const OFF: IndicatorState = IndicatorState {
        color: IndicatorColor::Off,
        brightness: 0.0,
    };

    #[must_use]
    pub fn new(color: IndicatorColor, brightness: f32) -> Self {
        Self { color, brightness }
    }
}
