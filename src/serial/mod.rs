//! # Serial Communication Module
//!
//! Both serial links of the vessel.
//!
//! This module handles:
//! - Opening ports with 8N1 framing
//! - Writing indicator tower frames ([`IndicatorLink`])
//! - Keeping the autonomy link receiver alive across unplug / replug
//!   ([`serve_autonomy_link`])

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::config::{AutonomyLinkConfig, IndicatorConfig};
use crate::error::{HelmError, Result};
use crate::indicator::IndicatorFrame;
use crate::link::{run_receiver, CommandPublisher, LinkDecoder};

/// Opens `path` at `baud_rate`, 8 data bits, no parity, 1 stop bit, no flow
/// control.
///
/// # Errors
///
/// Returns [`HelmError::Serial`] naming the path if the device cannot be
/// opened.
pub fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    use tokio_serial::SerialPortBuilderExt;

    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| HelmError::Serial(format!("Failed to open {}: {}", path, e)))
}

/// Output link to the indicator tower.
///
/// Fire-and-forget: frames are written and flushed, nothing is read back.
pub struct IndicatorLink<P: SerialPortIO> {
    port: P,
    device_path: String,
}

impl<P: SerialPortIO> std::fmt::Debug for IndicatorLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl IndicatorLink<TokioSerialPort> {
    /// Opens the tower's serial port from `[indicator]`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vessel_helm::config::IndicatorConfig;
    /// use vessel_helm::serial::IndicatorLink;
    ///
    /// let link = IndicatorLink::open(&IndicatorConfig::default())?;
    /// println!("Indicator tower on {}", link.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &IndicatorConfig) -> Result<Self> {
        if config.port.is_empty() {
            return Err(HelmError::SerialPortNotFound("<empty>".to_string()));
        }
        let port = open_port(&config.port, config.baud_rate)?;
        info!("Indicator tower on {} ({} baud)", config.port, config.baud_rate);
        Ok(Self::new(TokioSerialPort::new(port), config.port.clone()))
    }
}

impl<P: SerialPortIO> IndicatorLink<P> {
    pub fn new(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
        }
    }

    /// Writes one frame as a contiguous burst.
    ///
    /// # Errors
    ///
    /// Returns [`HelmError::Serial`] if the write or flush fails.
    pub async fn send_frame(&mut self, frame: &IndicatorFrame) -> Result<()> {
        self.port
            .write_all(frame)
            .await
            .map_err(|e| HelmError::Serial(format!("Failed to write indicator frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| HelmError::Serial(format!("Failed to flush indicator port: {}", e)))?;

        debug!("Sent indicator frame ({} bytes)", frame.len());
        Ok(())
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Runs the autonomy receiver, reopening the link with `open` whenever it
/// fails or reaches end of stream.
///
/// Returns once the control task has dropped its subscriber.
pub async fn supervise_link<F, R>(
    mut open: F,
    max_message_len: usize,
    reconnect_interval: Duration,
    publisher: CommandPublisher,
) where
    F: FnMut() -> Result<R>,
    R: AsyncRead + Unpin,
{
    let mut failing = false;

    while !publisher.is_closed() {
        match open() {
            Ok(reader) => {
                info!("Autonomy link connected");
                failing = false;
                let decoder = LinkDecoder::new(max_message_len);
                if let Err(e) = run_receiver(reader, decoder, &publisher).await {
                    warn!("Autonomy link lost: {}", e);
                }
            }
            Err(e) if !failing => {
                warn!("Autonomy link unavailable: {} (retrying every {:?})", e, reconnect_interval);
                failing = true;
            }
            Err(e) => debug!("Autonomy link still unavailable: {}", e),
        }

        tokio::time::sleep(reconnect_interval).await;
    }

    debug!("Autonomy link supervisor stopped");
}

/// [`supervise_link`] over the serial port named in `[autonomy_link]`.
pub async fn serve_autonomy_link(config: AutonomyLinkConfig, publisher: CommandPublisher) {
    let path = config.port.clone();
    let baud_rate = config.baud_rate;
    supervise_link(
        move || open_port(&path, baud_rate),
        config.max_message_len,
        config.reconnect_interval(),
        publisher,
    )
    .await;
}
