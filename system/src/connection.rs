use crate::bulk;
use crate::codec;
use crate::error::{Result, SystemError};
use crate::message::WireMessage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Longest accepted message line, terminator included.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Ingress half of a connection.
pub struct MessageReader<R> {
    inner: R,
    line: Vec<u8>,
}

impl<R> MessageReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
        }
    }

    /// Reads the next message. `Ok(None)` means the peer closed the stream
    /// between messages.
    ///
    /// `MalformedEvent` consumes the offending line only, so the reader can
    /// be used again afterwards.
    pub async fn next_message(&mut self) -> Result<Option<WireMessage>> {
        loop {
            self.line.clear();
            let read = (&mut self.inner)
                .take(MAX_MESSAGE_BYTES as u64)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == 0 {
                return Ok(None);
            }
            if self.line.last() != Some(&b'\n') {
                if read == MAX_MESSAGE_BYTES {
                    return Err(SystemError::ProtocolViolation(format!(
                        "message longer than {} bytes",
                        MAX_MESSAGE_BYTES
                    )));
                }
                return Err(SystemError::unexpected_eof("message ended early"));
            }
            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let message = codec::decode(&self.line)?;
            log::debug!("Ingress {:?}", message);
            return Ok(Some(message));
        }
    }

    /// Reads the bulk payload that follows a `save` message.
    pub async fn read_bulk(&mut self, cap: u64) -> Result<Vec<u8>> {
        bulk::receive_bulk(&mut self.inner, cap).await
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Egress half of a connection. Every frame is written under one lock so
/// concurrent senders never interleave their bytes.
pub struct MessageWriter<W> {
    inner: Mutex<W>,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub async fn send(&self, message: &WireMessage) -> Result<()> {
        log::debug!("Egress {:?}", message);
        self.send_encoded(&codec::encode(message)).await
    }

    /// Writes a frame produced by [`codec::encode`], letting a broadcast
    /// encode once for all recipients.
    pub async fn send_encoded(&self, frame: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.write_all(frame).await?;
        inner.flush().await?;
        Ok(())
    }

    /// Writes `message` immediately followed by a bulk payload.
    pub async fn send_with_bulk(&self, message: &WireMessage, payload: &[u8]) -> Result<()> {
        self.send_with_bulk_ordered(message, payload, || ()).await
    }

    /// Like [`MessageWriter::send_with_bulk`], but runs `on_locked` once the
    /// writer lock is held. Bookkeeping done there happens in the same order
    /// as the frames reach the wire.
    pub async fn send_with_bulk_ordered<F>(
        &self,
        message: &WireMessage,
        payload: &[u8],
        on_locked: F,
    ) -> Result<()>
    where
        F: FnOnce(),
    {
        log::debug!("Egress {:?} with {} bulk bytes", message, payload.len());
        let frame = codec::encode(message);
        let mut inner = self.inner.lock().await;
        on_locked();
        inner.write_all(&frame).await?;
        bulk::write_bulk(&mut *inner, payload).await?;
        inner.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.inner.lock().await.shutdown().await?;
        Ok(())
    }
}
