//! # Vessel Helm Library
//!
//! Command arbitration and safety interlock for an autonomous / remote-controlled
//! surface vessel.
//!
//! Every control cycle the [`arbiter`] combines the physical E-stop button, the
//! RC receiver channels and the freshness of the autonomy computer's commands
//! into a single actuator command and an indicator tower color. The remaining
//! modules are thin I/O around that decision.

pub mod actuator;
pub mod arbiter;
pub mod config;
pub mod control;
pub mod error;
pub mod hardware;
pub mod indicator;
pub mod input;
pub mod link;
pub mod serial;
pub mod telemetry;
