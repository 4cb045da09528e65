//! # Indicator Frame Encoder
//!
//! Encodes indicator states into tower frames and decides when a frame may
//! be sent.

use std::time::Duration;
use tokio::time::Instant;

use super::protocol::*;

/// Encode an indicator state into a complete tower frame
///
/// # Examples
///
/// ```
/// use vessel_helm::indicator::{encode_indicator_frame, IndicatorColor, IndicatorState};
///
/// let frame = encode_indicator_frame(&IndicatorState::new(IndicatorColor::Green, 75.0));
/// assert_eq!(frame.len(), 10);
/// assert_eq!(&frame[..2], &[0xFF, 0x00]);
/// assert_eq!(&frame[2..6], &2.0f32.to_le_bytes());
/// ```
#[must_use]
pub fn encode_indicator_frame(state: &IndicatorState) -> IndicatorFrame {
    let mut frame = [0u8; INDICATOR_FRAME_LEN];
    frame[0] = INDICATOR_HEADER;
    frame[1] = INDICATOR_MSG_SET_LIGHT;
    frame[2..6].copy_from_slice(&f32::from(state.color.code()).to_le_bytes());
    frame[6..10].copy_from_slice(&state.brightness.to_le_bytes());
    frame
}

/// Rate limiter for the tower link.
///
/// A frame is produced at most once per interval, and always carries the
/// state passed at that moment; states in between are simply never sent.
#[derive(Debug, Clone)]
pub struct IndicatorScheduler {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl Default for IndicatorScheduler {
    fn default() -> Self {
        Self::new(INDICATOR_MIN_INTERVAL)
    }
}

impl IndicatorScheduler {
    /// Creates a scheduler. Intervals shorter than
    /// [`INDICATOR_MIN_INTERVAL`] are raised to it.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval: min_interval.max(INDICATOR_MIN_INTERVAL),
            last_sent: None,
        }
    }

    /// Returns a frame for `state` if the interval has elapsed since the
    /// previous frame, and records `now` as the new transmission time.
    pub fn poll(&mut self, state: &IndicatorState, now: Instant) -> Option<IndicatorFrame> {
        let due = match self.last_sent {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };

        if !due {
            return None;
        }

        self.last_sent = Some(now);
        Some(encode_indicator_frame(state))
    }

    /// Configured interval
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_indicator_frame(&IndicatorState::new(IndicatorColor::Red, 100.0));

        assert_eq!(frame[0], INDICATOR_HEADER);
        assert_eq!(frame[1], INDICATOR_MSG_SET_LIGHT);
        assert_eq!(frame[2..6], 1.0f32.to_le_bytes());
        assert_eq!(frame[6..10], 100.0f32.to_le_bytes());
    }

    #[test]
    fn test_encode_known_bytes() {
        // 2.0f32 = 0x40000000, 75.0f32 = 0x42960000
        let frame = encode_indicator_frame(&IndicatorState::new(IndicatorColor::Green, 75.0));
        assert_eq!(
            frame,
            [0xFF, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x96, 0x42]
        );
    }

    #[test]
    fn test_encode_off() {
        let frame = encode_indicator_frame(&IndicatorState::OFF);
        assert_eq!(frame, [0xFF, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_scheduler_first_poll_sends() {
        let mut scheduler = IndicatorScheduler::default();
        assert!(scheduler.poll(&IndicatorState::OFF, Instant::now()).is_some());
    }

    #[test]
    fn test_scheduler_rate_limits() {
        let mut scheduler = IndicatorScheduler::default();
        let start = Instant::now();
        let state = IndicatorState::new(IndicatorColor::Yellow, 75.0);

        assert!(scheduler.poll(&state, start).is_some());
        assert!(scheduler.poll(&state, start + Duration::from_millis(1)).is_none());
        assert!(scheduler.poll(&state, start + Duration::from_millis(499)).is_none());
        assert!(scheduler.poll(&state, start + Duration::from_millis(500)).is_some());
        assert!(scheduler.poll(&state, start + Duration::from_millis(900)).is_none());
        assert!(scheduler.poll(&state, start + Duration::from_millis(1000)).is_some());
    }

    #[test]
    fn test_scheduler_sends_state_at_poll_time() {
        let mut scheduler = IndicatorScheduler::default();
        let start = Instant::now();

        scheduler.poll(&IndicatorState::OFF, start);
        let frame = scheduler
            .poll(
                &IndicatorState::new(IndicatorColor::Purple, 100.0),
                start + Duration::from_secs(1),
            )
            .unwrap();
        assert_eq!(frame[2..6], 5.0f32.to_le_bytes());
    }

    #[test]
    fn test_scheduler_interval_floor() {
        let scheduler = IndicatorScheduler::new(Duration::from_millis(100));
        assert_eq!(scheduler.min_interval(), INDICATOR_MIN_INTERVAL);

        let scheduler = IndicatorScheduler::new(Duration::from_secs(2));
        assert_eq!(scheduler.min_interval(), Duration::from_secs(2));
    }
}
