//! # Mode Selection
//!
//! Pure, priority-ordered choice of the authoritative command source.
//!
//! | Priority | Mode | Condition |
//! |----------|------|-----------|
//! | 1 | Hard stop | E-stop button asserted, or receiver link off |
//! | 2 | Remote stop | Remote-stop channel at or below threshold |
//! | 3 | RC | Source-select channel above threshold |
//! | 4 | Auto (fresh) | Autonomy command within timeout |
//! | 4 | Auto (stale) | No autonomy command within timeout |
//!
//! The first matching row wins. There is no hysteresis: every cycle is
//! decided from scratch.

use crate::indicator::protocol::{
    IndicatorColor, IndicatorState, INDICATOR_BRIGHTNESS_MAX, INDICATOR_BRIGHTNESS_NORMAL,
};
use crate::input::SafetyInputs;

/// Why a hard stop was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Physical E-stop button asserted
    Button,
    /// RC receiver or transmitter switched off
    ReceiverOff,
}

/// Arbitration outcome for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HardStop(StopCause),
    RemoteStop,
    Rc,
    AutoFresh,
    AutoStale,
}

/// Whether the autonomy computer is currently trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomyStatus {
    Fresh,
    Stale,
}

/// Channel thresholds (normalized units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Remote-stop channel must be strictly above this to run
    pub remote_stop: f32,
    /// Source-select channel strictly above this gives RC authority
    pub source_select: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            remote_stop: 0.5,
            source_select: 0.5,
        }
    }
}

/// Selects the mode for one cycle.
///
/// NaN channel values never enable propulsion: a NaN remote-stop channel
/// reads as a stop request.
///
/// # Examples
///
/// ```
/// use vessel_helm::arbiter::mode::{select_mode, AutonomyStatus, Mode, StopCause, Thresholds};
/// use vessel_helm::input::SafetyInputs;
///
/// let inputs = SafetyInputs { button_asserted: true, remote_stop: 1.0, source_select: 1.0 };
/// let mode = select_mode(&inputs, AutonomyStatus::Fresh, &Thresholds::default());
/// assert_eq!(mode, Mode::HardStop(StopCause::Button));
/// ```
#[must_use]
pub fn select_mode(inputs: &SafetyInputs, autonomy: AutonomyStatus, thresholds: &Thresholds) -> Mode {
    if inputs.button_asserted {
        return Mode::HardStop(StopCause::Button);
    }

    if inputs.receiver_link_off() {
        return Mode::HardStop(StopCause::ReceiverOff);
    }

    let remote_run = inputs.remote_stop > thresholds.remote_stop;
    if !remote_run {
        return Mode::RemoteStop;
    }

    if inputs.source_select > thresholds.source_select {
        return Mode::Rc;
    }

    match autonomy {
        AutonomyStatus::Fresh => Mode::AutoFresh,
        AutonomyStatus::Stale => Mode::AutoStale,
    }
}

impl Mode {
    /// Indicator tower state shown in this mode
    #[must_use]
    pub fn indicator(&self) -> IndicatorState {
        match self {
            Mode::HardStop(_) | Mode::RemoteStop => {
                IndicatorState::new(IndicatorColor::Red, INDICATOR_BRIGHTNESS_MAX)
            }
            Mode::Rc => IndicatorState::new(IndicatorColor::Yellow, INDICATOR_BRIGHTNESS_NORMAL),
            Mode::AutoFresh => {
                IndicatorState::new(IndicatorColor::Green, INDICATOR_BRIGHTNESS_NORMAL)
            }
            Mode::AutoStale => IndicatorState::new(IndicatorColor::Purple, INDICATOR_BRIGHTNESS_MAX),
        }
    }

    /// `true` when the thrusters are forced to still
    #[must_use]
    pub fn forces_still(&self) -> bool {
        !matches!(self, Mode::Rc | Mode::AutoFresh)
    }

    /// Short name for logs and telemetry
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Mode::HardStop(StopCause::Button) => "hard_stop_button",
            Mode::HardStop(StopCause::ReceiverOff) => "hard_stop_receiver_off",
            Mode::RemoteStop => "remote_stop",
            Mode::Rc => "rc",
            Mode::AutoFresh => "auto",
            Mode::AutoStale => "auto_stale",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(button: bool, remote_stop: f32, source_select: f32) -> SafetyInputs {
        SafetyInputs {
            button_asserted: button,
            remote_stop,
            source_select,
        }
    }

    fn select(i: SafetyInputs, autonomy: AutonomyStatus) -> Mode {
        select_mode(&i, autonomy, &Thresholds::default())
    }

    #[test]
    fn test_button_beats_everything() {
        for remote_stop in [-1.0, 0.0, 0.9] {
            for source_select in [0.0, 0.9] {
                for autonomy in [AutonomyStatus::Fresh, AutonomyStatus::Stale] {
                    assert_eq!(
                        select(inputs(true, remote_stop, source_select), autonomy),
                        Mode::HardStop(StopCause::Button)
                    );
                }
            }
        }
    }

    #[test]
    fn test_receiver_off_is_hard_stop() {
        assert_eq!(
            select(inputs(false, -1.0, 0.9), AutonomyStatus::Fresh),
            Mode::HardStop(StopCause::ReceiverOff)
        );
    }

    #[test]
    fn test_remote_stop_below_threshold() {
        assert_eq!(select(inputs(false, 0.1, 0.9), AutonomyStatus::Fresh), Mode::RemoteStop);
        assert_eq!(select(inputs(false, 0.1, 0.1), AutonomyStatus::Fresh), Mode::RemoteStop);
    }

    #[test]
    fn test_remote_stop_at_threshold_stops() {
        assert_eq!(select(inputs(false, 0.5, 0.9), AutonomyStatus::Fresh), Mode::RemoteStop);
    }

    #[test]
    fn test_remote_stop_nan_stops() {
        assert_eq!(
            select(inputs(false, f32::NAN, 0.9), AutonomyStatus::Fresh),
            Mode::RemoteStop
        );
    }

    #[test]
    fn test_rc_mode() {
        assert_eq!(select(inputs(false, 0.9, 0.9), AutonomyStatus::Fresh), Mode::Rc);
        assert_eq!(select(inputs(false, 0.9, 0.9), AutonomyStatus::Stale), Mode::Rc);
    }

    #[test]
    fn test_source_select_at_threshold_is_auto() {
        assert_eq!(select(inputs(false, 0.9, 0.5), AutonomyStatus::Fresh), Mode::AutoFresh);
    }

    #[test]
    fn test_auto_fresh_and_stale() {
        assert_eq!(select(inputs(false, 0.9, 0.1), AutonomyStatus::Fresh), Mode::AutoFresh);
        assert_eq!(select(inputs(false, 0.9, 0.1), AutonomyStatus::Stale), Mode::AutoStale);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            remote_stop: 0.2,
            source_select: 0.8,
        };
        let mode = select_mode(&inputs(false, 0.3, 0.7), AutonomyStatus::Fresh, &thresholds);
        assert_eq!(mode, Mode::AutoFresh);
    }

    #[test]
    fn test_indicator_per_mode() {
        let red = IndicatorState::new(IndicatorColor::Red, 100.0);
        assert_eq!(Mode::HardStop(StopCause::Button).indicator(), red);
        assert_eq!(Mode::HardStop(StopCause::ReceiverOff).indicator(), red);
        assert_eq!(Mode::RemoteStop.indicator(), red);
        assert_eq!(Mode::Rc.indicator(), IndicatorState::new(IndicatorColor::Yellow, 75.0));
        assert_eq!(Mode::AutoFresh.indicator(), IndicatorState::new(IndicatorColor::Green, 75.0));
        assert_eq!(Mode::AutoStale.indicator(), IndicatorState::new(IndicatorColor::Purple, 100.0));
    }

    #[test]
    fn test_forces_still() {
        assert!(Mode::HardStop(StopCause::Button).forces_still());
        assert!(Mode::RemoteStop.forces_still());
        assert!(Mode::AutoStale.forces_still());
        assert!(!Mode::Rc.forces_still());
        assert!(!Mode::AutoFresh.forces_still());
    }
}
