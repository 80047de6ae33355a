use crate::error::{Result, SystemError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single read while collecting a payload.
pub const READ_CHUNK_SIZE: usize = 1024;

/// `u64::MAX` has 20 decimal digits.
const MAX_HEADER_DIGITS: usize = 20;

/// Writes `<len>\n` followed by exactly `payload.len()` bytes.
pub async fn send_bulk<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_bulk(writer, payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Same as [`send_bulk`] without the trailing flush, for callers batching
/// several frames under one lock.
pub(crate) async fn write_bulk<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let header = format!("{}\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Reads one length-prefixed payload.
///
/// Reads are accumulated until exactly the announced number of bytes has
/// arrived, whatever size each individual read returns. A payload above
/// `cap` is drained from the stream and reported as `PayloadTooLarge`, which
/// leaves the connection aligned on the next message.
pub async fn receive_bulk<R>(reader: &mut R, cap: u64) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let len = read_header(reader).await?;

    if len > cap {
        let mut remaining = (&mut *reader).take(len);
        let discarded = tokio::io::copy(&mut remaining, &mut tokio::io::sink()).await?;
        if discarded < len {
            return Err(SystemError::unexpected_eof("bulk payload ended early"));
        }
        return Err(SystemError::PayloadTooLarge { len, cap });
    }

    let len = len as usize;
    let mut payload = Vec::with_capacity(len);
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    while payload.len() < len {
        let wanted = (len - payload.len()).min(READ_CHUNK_SIZE);
        let read = reader.read(&mut chunk[..wanted]).await?;
        if read == 0 {
            return Err(SystemError::unexpected_eof("bulk payload ended early"));
        }
        payload.extend_from_slice(&chunk[..read]);
    }
    Ok(payload)
}

async fn read_header<R>(reader: &mut R) -> Result<u64>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut header = Vec::with_capacity(MAX_HEADER_DIGITS + 1);
    (&mut *reader)
        .take(MAX_HEADER_DIGITS as u64 + 1)
        .read_until(b'\n', &mut header)
        .await?;

    match header.pop() {
        Some(b'\n') => {}
        None => return Err(SystemError::unexpected_eof("missing bulk header")),
        Some(_) if header.len() < MAX_HEADER_DIGITS => {
            return Err(SystemError::unexpected_eof("bulk header ended early"))
        }
        Some(_) => {
            return Err(SystemError::ProtocolViolation(
                "bulk header is too long".into(),
            ))
        }
    }
    if header.last() == Some(&b'\r') {
        header.pop();
    }
    if header.is_empty() || !header.iter().all(u8::is_ascii_digit) {
        return Err(SystemError::ProtocolViolation(format!(
            "invalid bulk header {:?}",
            String::from_utf8_lossy(&header)
        )));
    }

    std::str::from_utf8(&header)
        .ok()
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| SystemError::ProtocolViolation("bulk length out of range".into()))
}
