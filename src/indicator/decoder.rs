//! # Indicator Frame Decoder
//!
//! Decodes tower frames the way the tower itself reads them.

use super::protocol::*;
use crate::error::{HelmError, Result};

/// Decode a complete tower frame
///
/// # Errors
///
/// Returns error if:
/// - Frame is shorter than 10 bytes
/// - Header byte or message id is wrong
/// - Brightness is not a finite value
pub fn decode_indicator_frame(frame: &[u8]) -> Result<IndicatorState> {
    if frame.len() < INDICATOR_FRAME_LEN {
        return Err(HelmError::IndicatorProtocol(format!(
            "Frame too short: expected {} bytes, got {}",
            INDICATOR_FRAME_LEN,
            frame.len()
        )));
    }

    if frame[0] != INDICATOR_HEADER {
        return Err(HelmError::IndicatorProtocol(format!(
            "Invalid header byte: 0x{:02X}",
            frame[0]
        )));
    }

    if frame[1] != INDICATOR_MSG_SET_LIGHT {
        return Err(HelmError::IndicatorProtocol(format!(
            "Unknown message id: 0x{:02X}",
            frame[1]
        )));
    }

    let color = f32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]);
    let brightness = f32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]);

    if !brightness.is_finite() {
        return Err(HelmError::IndicatorProtocol(
            "Brightness is not finite".to_string(),
        ));
    }

    Ok(IndicatorState::new(IndicatorColor::from_code(color), brightness))
}

/// Raw color value carried by a frame, before mapping to a known color.
#[cfg(test)]
pub(crate) fn decode_raw_color(frame: &[u8]) -> Result<f32> {
    if frame.len() < INDICATOR_FRAME_LEN {
        return Err(HelmError::IndicatorProtocol("Frame too short".to_string()));
    }
    Ok(f32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]))
}
