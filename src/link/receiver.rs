//! # Autonomy Link Receiver
//!
//! Background task that reads the autonomy serial link, decodes messages and
//! hands complete commands to the control task.
//!
//! The handoff is a single-producer / single-consumer `tokio::sync::watch`
//! slot holding a whole [`AutonomyCommand`]. The control task can never see a
//! mix of old and new fields, and "new data available" becomes visible in the
//! same step as the record itself.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::decoder::LinkDecoder;
use super::protocol::AutonomyCommand;
use crate::error::Result;

/// Read chunk size for the serial stream
const READ_CHUNK: usize = 64;

/// Writing half of the command handoff, owned by the receiver task.
#[derive(Debug)]
pub struct CommandPublisher {
    tx: watch::Sender<Option<AutonomyCommand>>,
}

/// Reading half of the command handoff, owned by the control task.
#[derive(Debug)]
pub struct CommandSubscriber {
    rx: watch::Receiver<Option<AutonomyCommand>>,
    closed_reported: bool,
}

/// Creates a connected publisher / subscriber pair with no command yet.
#[must_use]
pub fn command_channel() -> (CommandPublisher, CommandSubscriber) {
    let (tx, rx) = watch::channel(None);
    (
        CommandPublisher { tx },
        CommandSubscriber {
            rx,
            closed_reported: false,
        },
    )
}

impl CommandPublisher {
    /// Replaces the current command. Succeeds even if nobody is listening.
    pub fn publish(&self, command: AutonomyCommand) {
        self.tx.send_replace(Some(command));
    }

    /// `true` once the control task has dropped its subscriber
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandSubscriber {
    /// Returns the latest command if one arrived since the previous call.
    ///
    /// Several commands published between two calls collapse into the most
    /// recent one.
    pub fn take_new(&mut self) -> Option<AutonomyCommand> {
        match self.rx.has_changed() {
            Ok(true) => *self.rx.borrow_and_update(),
            Ok(false) => None,
            Err(_) => {
                if !self.closed_reported {
                    warn!("Autonomy receiver stopped; no further commands will arrive");
                    self.closed_reported = true;
                }
                None
            }
        }
    }
}

/// Reads `reader` until end of stream, publishing every valid command.
///
/// Framing errors are logged and skipped; the previous command stays
/// authoritative until the arbiter times it out.
///
/// # Errors
///
/// Returns an error only when the underlying read fails.
pub async fn run_receiver<R>(
    mut reader: R,
    mut decoder: LinkDecoder,
    publisher: &CommandPublisher,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut received: u64 = 0;
    let mut rejected: u64 = 0;

    loop {
        buf.clear();
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            info!(
                "Autonomy link closed ({} commands received, {} rejected)",
                received, rejected
            );
            return Ok(());
        }

        for &byte in buf.iter() {
            match decoder.push_byte(byte) {
                Ok(Some(command)) => {
                    debug!("Autonomy command: {:?}", command);
                    publisher.publish(command);
                    received += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    rejected += 1;
                    debug!("Dropped autonomy message: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_take_new_initially_empty() {
        let (_publisher, mut subscriber) = command_channel();
        assert_eq!(subscriber.take_new(), None);
    }

    #[test]
    fn test_take_new_once_per_publish() {
        let (publisher, mut subscriber) = command_channel();
        let cmd = AutonomyCommand::new(0.1, 0.2, 0.3, 0.4);

        publisher.publish(cmd);
        assert_eq!(subscriber.take_new(), Some(cmd));
        assert_eq!(subscriber.take_new(), None);
    }

    #[test]
    fn test_latest_publish_wins() {
        let (publisher, mut subscriber) = command_channel();
        publisher.publish(AutonomyCommand::new(0.1, 0.1, 0.1, 0.1));
        publisher.publish(AutonomyCommand::new(0.9, 0.9, 0.9, 0.9));

        assert_eq!(
            subscriber.take_new(),
            Some(AutonomyCommand::new(0.9, 0.9, 0.9, 0.9))
        );
    }

    #[test]
    fn test_take_new_after_publisher_dropped() {
        let (publisher, mut subscriber) = command_channel();
        drop(publisher);
        assert_eq!(subscriber.take_new(), None);
        assert_eq!(subscriber.take_new(), None);
    }

    #[tokio::test]
    async fn test_receiver_publishes_valid_commands() {
        let reader = Builder::new()
            .read(b"0.50,0.46,")
            .read(b"0.50,0.46e")
            .build();
        let (publisher, mut subscriber) = command_channel();

        run_receiver(reader, LinkDecoder::default(), &publisher)
            .await
            .unwrap();

        assert_eq!(
            subscriber.take_new(),
            Some(AutonomyCommand::new(0.5, 0.46, 0.5, 0.46))
        );
    }

    #[tokio::test]
    async fn test_receiver_ignores_malformed_messages() {
        let reader = Builder::new().read(b"0.5,0.3,e").build();
        let (publisher, mut subscriber) = command_channel();

        run_receiver(reader, LinkDecoder::default(), &publisher)
            .await
            .unwrap();

        assert_eq!(subscriber.take_new(), None);
    }

    #[tokio::test]
    async fn test_receiver_keeps_last_good_command() {
        let reader = Builder::new()
            .read(b"0.1,0.2,0.3,0.4e")
            .read(b"0.9,bad,0.9,0.9e")
            .build();
        let (publisher, mut subscriber) = command_channel();

        run_receiver(reader, LinkDecoder::default(), &publisher)
            .await
            .unwrap();

        assert_eq!(
            subscriber.take_new(),
            Some(AutonomyCommand::new(0.1, 0.2, 0.3, 0.4))
        );
    }

    #[tokio::test]
    async fn test_receiver_propagates_read_error() {
        let reader = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let (publisher, _subscriber) = command_channel();

        let result = run_receiver(reader, LinkDecoder::default(), &publisher).await;
        assert!(result.is_err());
    }
}
