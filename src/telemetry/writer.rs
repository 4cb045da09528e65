//! Background telemetry writer.
//!
//! File writes, flushes and pruning run on a blocking thread fed through a
//! bounded queue, so the control task only ever does a non-blocking send.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::logger::TelemetryLogger;
use super::record::TelemetryRecord;
use crate::error::{HelmError, Result};

/// Records buffered between the control task and the writer thread
pub const TELEMETRY_QUEUE_LEN: usize = 256;

/// Control-side handle to the telemetry writer.
///
/// Dropping every sender lets the writer drain its queue and exit.
#[derive(Debug, Clone)]
pub struct TelemetrySender {
    tx: mpsc::Sender<TelemetryRecord>,
}

impl TelemetrySender {
    /// Queues a record without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`HelmError::Telemetry`] when the queue is full or the writer
    /// has stopped. The record is dropped in both cases.
    pub fn try_record(&self, record: TelemetryRecord) -> Result<()> {
        self.tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => HelmError::Telemetry("telemetry queue full".to_string()),
            TrySendError::Closed(_) => HelmError::Telemetry("telemetry writer stopped".to_string()),
        })
    }
}

/// Moves `logger` onto a blocking thread and returns the sender feeding it.
///
/// The returned handle completes once all senders are dropped and the queued
/// records are written.
pub fn spawn_writer(mut logger: TelemetryLogger) -> (TelemetrySender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<TelemetryRecord>(TELEMETRY_QUEUE_LEN);

    let handle = tokio::task::spawn_blocking(move || {
        let mut failing = false;
        let mut written: u64 = 0;

        while let Some(record) = rx.blocking_recv() {
            match logger.log(&record) {
                Ok(()) => {
                    failing = false;
                    written += 1;
                }
                Err(e) if !failing => {
                    warn!("Telemetry write failed: {}", e);
                    failing = true;
                }
                Err(_) => {}
            }
        }

        debug!("Telemetry writer stopped after {} records", written);
    });

    (TelemetrySender { tx }, handle)
}
