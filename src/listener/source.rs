//! Transports that deliver raw envelope messages.

use std::future::Future;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Errors from the transport itself (not from the messages it carries).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport disconnected: {0}")]
    Disconnected(String),
}

/// A FIFO source of raw messages.
pub trait EnvelopeSource {
    /// Waits for the next message.
    ///
    /// `Ok(None)` means the transport has closed and no further messages will
    /// arrive.
    fn next_message(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Re-establishes the connection after `next_message` failed.
    ///
    /// Transports that recover on their own can rely on the default.
    fn reconnect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }
}

/// Newline-delimited messages read from any async reader (stdin in the binary).
///
/// Blank lines are skipped. Bytes that are not valid UTF-8 are replaced with
/// U+FFFD, so an undecodable line reaches the listener as a malformed message
/// instead of failing the transport.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R> EnvelopeSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }
}
