//! # Input Normalizer
//!
//! Rescales receiver pulse widths into command channels.
//!
//! A 1–2 ms pulse maps to roughly 0.0–1.0 (`ms - 1`). Nothing is clamped
//! here: a silent channel (zero pulse width) reads as exactly `-1.0`, which the
//! arbiter interprets as "receiver link off".

use std::time::Duration;

use super::{PulseSource, ReceiverChannel};

/// Normalized value of a channel whose pulse width is zero.
pub const LINK_OFF_VALUE: f32 = -1.0;

/// Converts a measured pulse width into a normalized command value.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vessel_helm::input::normalize_pulse_width;
///
/// assert!((normalize_pulse_width(Duration::from_micros(1500)) - 0.5).abs() < 1e-6);
/// assert_eq!(normalize_pulse_width(Duration::ZERO), -1.0);
/// ```
#[must_use]
pub fn normalize_pulse_width(width: Duration) -> f32 {
    (width.as_secs_f32() * 1000.0) - 1.0
}

/// All six receiver channels, normalized, sampled once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcSnapshot {
    pub throttle: f32,
    pub elevation: f32,
    pub aileron: f32,
    pub rudder: f32,
    pub source_select: f32,
    pub remote_stop: f32,
}

impl Default for RcSnapshot {
    /// A receiver that has never produced a pulse.
    fn default() -> Self {
        Self {
            throttle: LINK_OFF_VALUE,
            elevation: LINK_OFF_VALUE,
            aileron: LINK_OFF_VALUE,
            rudder: LINK_OFF_VALUE,
            source_select: LINK_OFF_VALUE,
            remote_stop: LINK_OFF_VALUE,
        }
    }
}

impl RcSnapshot {
    /// Reads every channel from `source` exactly once.
    pub fn sample<S: PulseSource + ?Sized>(source: &S) -> Self {
        let read = |channel| normalize_pulse_width(source.pulse_width(channel));
        Self {
            throttle: read(ReceiverChannel::Throttle),
            elevation: read(ReceiverChannel::Elevation),
            aileron: read(ReceiverChannel::Aileron),
            rudder: read(ReceiverChannel::Rudder),
            source_select: read(ReceiverChannel::SourceSelect),
            remote_stop: read(ReceiverChannel::RemoteStop),
        }
    }
}

/// The inputs that decide between stopping and running, captured together so
/// one arbitration never mixes reads from different moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyInputs {
    /// Physical E-stop asserted
    pub button_asserted: bool,
    /// Normalized remote-stop channel
    pub remote_stop: f32,
    /// Normalized source-select channel
    pub source_select: f32,
}

impl SafetyInputs {
    /// Builds the safety snapshot from a button read and a receiver snapshot.
    #[must_use]
    pub fn new(button_asserted: bool, rc: &RcSnapshot) -> Self {
        Self {
            button_asserted,
            remote_stop: rc.remote_stop,
            source_select: rc.source_select,
        }
    }

    /// The remote-stop channel carries no pulse at all, meaning the
    /// receiver or transmitter is switched off.
    #[must_use]
    pub fn receiver_link_off(&self) -> bool {
        self.remote_stop <= LINK_OFF_VALUE
    }
}
