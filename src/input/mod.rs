//! # Input Module
//!
//! RC receiver and E-stop button inputs.
//!
//! This module handles:
//! - The boundary traits for the hardware that measures receiver pulse widths
//!   and reads the physical E-stop button
//! - Rescaling raw pulse widths into normalized command channels
//! - Taking one consistent snapshot of the safety inputs per control cycle

use std::time::Duration;

pub mod normalizer;

pub use normalizer::{normalize_pulse_width, RcSnapshot, SafetyInputs};

/// The six receiver channels, named by what they do on the boat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverChannel {
    /// Left stick vertical. Sampled but not mapped to an actuator.
    Throttle,
    /// Back thruster power in RC mode.
    Elevation,
    /// Front thruster power in RC mode.
    Aileron,
    /// Back pod steering in RC mode.
    Rudder,
    /// Above threshold: RC has authority. At or below: autonomy has authority.
    SourceSelect,
    /// Above threshold: run. At or below: stop. Zero pulse: transmitter off.
    RemoteStop,
}

impl ReceiverChannel {
    /// All channels in sampling order
    pub const ALL: [ReceiverChannel; 6] = [
        ReceiverChannel::Throttle,
        ReceiverChannel::Elevation,
        ReceiverChannel::Aileron,
        ReceiverChannel::Rudder,
        ReceiverChannel::SourceSelect,
        ReceiverChannel::RemoteStop,
    ];
}

/// Source of measured receiver pulse widths.
///
/// Implementations return the most recent complete high pulse for a channel,
/// or [`Duration::ZERO`] when the channel has gone silent.
#[cfg_attr(test, mockall::automock)]
pub trait PulseSource: Send {
    /// Most recent pulse width measured on `channel`
    fn pulse_width(&self, channel: ReceiverChannel) -> Duration;
}

/// The physical E-stop button.
///
/// The input is pull-down biased and the closed (normal) circuit reads high,
/// so a pressed button or a cut wire both read as asserted. There is no
/// debounce: the pull resistor is the only filtering and the pin is re-read
/// every cycle.
#[cfg_attr(test, mockall::automock)]
pub trait EstopButton: Send {
    /// `true` when the vessel must stop
    fn is_asserted(&self) -> bool;
}
