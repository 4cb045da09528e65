//! # Autonomy Link Module
//!
//! ASCII command link from the onboard autonomy computer.
//!
//! This module handles:
//! - Message format constants and the [`AutonomyCommand`] record
//! - Terminator-delimited framing with a bounded buffer
//! - Parsing four comma-separated decimal fields
//! - Publishing complete commands to the control task as one whole record

pub mod decoder;
pub mod protocol;
pub mod receiver;

pub use decoder::LinkDecoder;
pub use protocol::AutonomyCommand;
pub use receiver::{command_channel, run_receiver, CommandPublisher, CommandSubscriber};
