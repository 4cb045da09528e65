//! Write-side abstraction over a serial port, so the indicator link can be
//! exercised without hardware.

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncWriteExt;

/// Byte sink behind the indicator link
#[async_trait]
pub trait SerialPortIO: Send {
    /// Writes the whole buffer
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Pushes buffered bytes onto the wire
    async fn flush(&mut self) -> io::Result<()>;
}

/// [`SerialPortIO`] over an open `tokio_serial::SerialStream`
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(&mut self.port, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(&mut self.port).await
    }
}
