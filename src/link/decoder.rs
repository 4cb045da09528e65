//! # Autonomy Link Decoder
//!
//! Assembles terminator-delimited messages byte by byte and parses them into
//! [`AutonomyCommand`] records.
//!
//! Malformed input never produces a partial command: the buffered message is
//! dropped and scanning continues with the next byte.

use bytes::BytesMut;

use super::protocol::*;
use crate::error::{HelmError, Result};

/// Incremental decoder for the autonomy link.
///
/// # Examples
///
/// ```
/// use vessel_helm::link::LinkDecoder;
///
/// let mut decoder = LinkDecoder::default();
/// let mut last = None;
/// for &byte in b"0.50,0.46,0.50,0.46e" {
///     if let Ok(Some(cmd)) = decoder.push_byte(byte) {
///         last = Some(cmd);
///     }
/// }
/// assert_eq!(last.unwrap().front_thrust, 0.46);
/// ```
#[derive(Debug)]
pub struct LinkDecoder {
    buffer: BytesMut,
    max_len: usize,
    overflowed: bool,
}

impl Default for LinkDecoder {
    fn default() -> Self {
        Self::new(AUTONOMY_MAX_MESSAGE_LEN)
    }
}

impl LinkDecoder {
    /// Creates a decoder that buffers at most `max_len` message bytes.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_len),
            max_len,
            overflowed: false,
        }
    }

    /// Number of bytes currently buffered
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one byte from the link.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(cmd))` - the byte completed a valid message
    /// * `Ok(None)` - the byte was buffered (or discarded after an overflow)
    ///
    /// # Errors
    ///
    /// Returns [`HelmError::LinkProtocol`] when the byte completes a malformed
    /// message, or when the message outgrows the buffer. In both cases the
    /// buffered message is dropped; the decoder stays usable.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<AutonomyCommand>> {
        if byte == AUTONOMY_TERMINATOR {
            let overflowed = std::mem::take(&mut self.overflowed);
            let message = self.buffer.split();
            if overflowed {
                // Already reported when the overflow happened
                return Ok(None);
            }
            return parse_bytes(&message).map(Some);
        }

        if self.overflowed {
            return Ok(None);
        }

        // Check the bound before storing, never after
        if self.buffer.len() >= self.max_len {
            self.buffer.clear();
            self.overflowed = true;
            return Err(HelmError::LinkProtocol(format!(
                "message exceeds {} bytes without terminator",
                self.max_len
            )));
        }

        self.buffer.extend_from_slice(&[byte]);
        Ok(None)
    }
}

fn parse_bytes(message: &[u8]) -> Result<AutonomyCommand> {
    let text = std::str::from_utf8(message)
        .map_err(|_| HelmError::LinkProtocol("message is not valid ASCII".to_string()))?;
    parse_message(text)
}

/// Parses the body of one message (terminator already stripped).
///
/// # Errors
///
/// Returns [`HelmError::LinkProtocol`] unless the text holds exactly four
/// finite decimal fields.
///
/// # Examples
///
/// ```
/// use vessel_helm::link::decoder::parse_message;
///
/// let cmd = parse_message("0.50,0.46,0.50,0.46").unwrap();
/// assert_eq!(cmd.back_steer, 0.5);
/// assert!(parse_message("0.5,0.3,").is_err());
/// ```
pub fn parse_message(text: &str) -> Result<AutonomyCommand> {
    let mut values = [0.0f32; AUTONOMY_FIELD_COUNT];
    let mut count = 0;

    for field in text.split(AUTONOMY_FIELD_SEPARATOR) {
        if count == AUTONOMY_FIELD_COUNT {
            return Err(HelmError::LinkProtocol(format!(
                "expected {} fields, got more",
                AUTONOMY_FIELD_COUNT
            )));
        }

        let value: f32 = field.trim().parse().map_err(|_| {
            HelmError::LinkProtocol(format!("field {} is not a number: {:?}", count + 1, field))
        })?;

        if !value.is_finite() {
            return Err(HelmError::LinkProtocol(format!(
                "field {} is not finite: {:?}",
                count + 1,
                field
            )));
        }

        values[count] = value;
        count += 1;
    }

    if count != AUTONOMY_FIELD_COUNT {
        return Err(HelmError::LinkProtocol(format!(
            "expected {} fields, got {}",
            AUTONOMY_FIELD_COUNT, count
        )));
    }

    Ok(AutonomyCommand::new(values[0], values[1], values[2], values[3]))
}
