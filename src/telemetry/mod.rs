//! # Telemetry Module
//!
//! Records what the arbiter decided, as JSON Lines files with rotation.
//!
//! This module handles:
//! - Building one [`TelemetryRecord`] per logged cycle
//! - Writing records to `telemetry_<session>_<seq>.jsonl`
//! - Starting a new file after N records and keeping only the newest M files
//! - Doing the file I/O on a blocking thread fed by a bounded queue

pub mod logger;
pub mod record;
pub mod writer;

pub use logger::TelemetryLogger;
pub use record::{TelemetryEvent, TelemetryRecord};
pub use writer::{spawn_writer, TelemetrySender};
