//! # Indicator Tower Module
//!
//! Status light tower protocol.
//!
//! This module handles:
//! - Color codes and the (color, brightness) indicator state
//! - Encoding the fixed 10-byte tower frame
//! - Rate limiting transmissions to the tower's 2 Hz refresh budget
//! - Decoding frames on the receiving side (used for diagnostics and tests)

pub mod decoder;
pub mod encoder;
pub mod protocol;

pub use encoder::{encode_indicator_frame, IndicatorScheduler};
pub use protocol::{IndicatorColor, IndicatorFrame, IndicatorState};
