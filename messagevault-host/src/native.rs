//! Browser native-messaging framing: a little-endian `u32` byte length
//! followed by that many bytes of UTF-8 JSON, in both directions.

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message the browser accepts from a host.
pub const MAX_OUTBOUND_BYTES: usize = 1024 * 1024;
/// Largest message the browser sends to a host.
pub const MAX_INBOUND_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message of {0} bytes exceeds the native messaging limit")]
    TooLarge(usize),
    #[error("channel closed mid-frame")]
    Truncated,
}

/// Inbound half of the channel. `recv_raw` yields `None` once the browser
/// disconnects at a frame boundary.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub async fn recv_raw(&mut self) -> Result<Option<Vec<u8>>, NativeError> {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < len_buf.len() {
            let read = self.reader.read(&mut len_buf[filled..]).await?;
            if read == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(NativeError::Truncated)
                };
            }
            filled += read;
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_INBOUND_BYTES {
            return Err(NativeError::TooLarge(len));
        }
        let mut payload = vec![0u8; len];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::UnexpectedEof => NativeError::Truncated,
                _ => NativeError::Io(err),
            })?;
        Ok(Some(payload))
    }
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), NativeError> {
        let payload = serde_json::to_vec(message)?;
        if payload.len() > MAX_OUTBOUND_BYTES {
            return Err(NativeError::TooLarge(payload.len()));
        }
        self.writer
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await?;
        self.writer.write_all(&payload).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn reads_consecutive_frames_then_disconnect() {
        let mut input = frame(br#"{"type":"A"}"#);
        input.extend(frame(br#"{"type":"B"}"#));
        let mut reader = FrameReader::new(input.as_slice());

        let first = reader.recv_raw().await.unwrap().unwrap();
        let second = reader.recv_raw().await.unwrap().unwrap();
        assert_eq!(first, br#"{"type":"A"}"#);
        assert_eq!(second, br#"{"type":"B"}"#);
        assert!(reader.recv_raw().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_length_prefix_is_an_error() {
        let input = [5u8, 0];
        let mut reader = FrameReader::new(&input[..]);
        assert!(matches!(
            reader.recv_raw().await,
            Err(NativeError::Truncated)
        ));
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let mut input = 10u32.to_le_bytes().to_vec();
        input.extend_from_slice(b"{}");
        let mut reader = FrameReader::new(input.as_slice());
        assert!(matches!(
            reader.recv_raw().await,
            Err(NativeError::Truncated)
        ));
    }

    #[tokio::test]
    async fn rejects_oversized_inbound_length() {
        let input = u32::MAX.to_le_bytes();
        let mut reader = FrameReader::new(&input[..]);
        assert!(matches!(
            reader.recv_raw().await,
            Err(NativeError::TooLarge(_))
        ));
    }

    #[tokio::test]
    async fn writes_length_prefixed_json() {
        let mut written = Vec::new();
        FrameWriter::new(&mut written)
            .send(&json!({ "status": "saved" }))
            .await
            .unwrap();

        let expected = br#"{"status":"saved"}"#;
        assert_eq!(&written[..4], &(expected.len() as u32).to_le_bytes());
        assert_eq!(&written[4..], expected);
    }

    #[tokio::test]
    async fn refuses_oversized_outbound_message() {
        let mut written = Vec::new();
        let huge = "x".repeat(MAX_OUTBOUND_BYTES);
        let err = FrameWriter::new(&mut written)
            .send(&json!({ "text": huge }))
            .await
            .unwrap_err();
        assert!(matches!(err, NativeError::TooLarge(_)));
        assert!(written.is_empty());
    }
}
