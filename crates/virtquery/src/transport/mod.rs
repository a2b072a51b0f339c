//! Transport layer for the RPC connection.
//!
//! Only local Unix sockets are supported; the daemon is always on the
//! same host as the caller.

mod unix;

pub use unix::UnixTransport;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::message::{MessageError, MAX_MESSAGE_LEN};

/// A framed, bidirectional byte channel to the daemon.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one already-framed message (length prefix included).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one message body. The length prefix is consumed here;
    /// the returned bytes start at the message header.
    async fn recv(&mut self) -> Result<Bytes>;

    /// Close the channel.
    async fn close(&mut self) -> Result<()>;
}

/// Read one length-prefixed message body.
async fn read_framed<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> Result<Bytes> {
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let total_len = u32::from_be_bytes(len_buf) as usize;

    if total_len > MAX_MESSAGE_LEN {
        return Err(MessageError::Oversized(total_len).into());
    }

    // The length field counts itself.
    let body_len = total_len.saturating_sub(4);
    if body_len == 0 {
        return Ok(Bytes::new());
    }

    buf.resize(body_len, 0);
    reader.read_exact(buf).await?;

    Ok(Bytes::copy_from_slice(buf))
}

/// Write one framed message. `data` already carries its length prefix.
async fn write_framed<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    writer.write_all(data).await?;
    writer.flush().await?;

    Ok(())
}
