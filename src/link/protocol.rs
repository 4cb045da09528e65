//! # Autonomy Link Protocol
//!
//! Message format: four comma-separated decimal fields followed by a single
//! terminator byte, e.g. `0.50,0.46,0.50,0.46e`.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | 1 | Front pod steering (0.0–1.0) |
//! | 2 | Front thrust (0.0–1.0, remapped to the ESC band) |
//! | 3 | Back pod steering (0.0–1.0) |
//! | 4 | Back thrust (0.0–1.0, remapped to the ESC band) |
//!
//! The terminator doubles as the exponent marker of scientific notation, so
//! fields are plain decimals only.

/// Message terminator (ASCII `'e'`)
pub const AUTONOMY_TERMINATOR: u8 = 0x65;

/// Field separator
pub const AUTONOMY_FIELD_SEPARATOR: char = ',';

/// Number of fields in a complete message
pub const AUTONOMY_FIELD_COUNT: usize = 4;

/// Default bound on buffered message bytes (terminator excluded)
pub const AUTONOMY_MAX_MESSAGE_LEN: usize = 100;

/// Link baud rate used by the autonomy computer
pub const AUTONOMY_BAUD_RATE: u32 = 115_200;

/// One complete command from the autonomy computer.
///
/// The four values always travel together: a record is only ever created
/// from a fully validated message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutonomyCommand {
    pub front_steer: f32,
    pub front_thrust: f32,
    pub back_steer: f32,
    pub back_thrust: f32,
}

impl AutonomyCommand {
    /// Creates a command from the four message fields, in wire order.
    #[must_use]
    pub fn new(front_steer: f32, front_thrust: f32, back_steer: f32, back_thrust: f32) -> Self {
        Self {
            front_steer,
            front_thrust,
            back_steer,
            back_thrust,
        }
    }

    /// Formats the command as a wire message, terminator included.
    ///
    /// # Examples
    ///
    /// ```
    /// use vessel_helm::link::AutonomyCommand;
    ///
    /// let cmd = AutonomyCommand::new(0.5, 0.46, 0.5, 0.46);
    /// assert_eq!(cmd.to_message(), "0.50,0.46,0.50,0.46e");
    /// ```
    #[must_use]
    pub fn to_message(&self) -> String {
        format!(
            "{:.2},{:.2},{:.2},{:.2}{}",
            self.front_steer,
            self.front_thrust,
            self.back_steer,
            self.back_thrust,
            AUTONOMY_TERMINATOR as char
        )
    }
}
