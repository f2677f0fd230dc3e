// ABOUTME: Brace-balanced JSON framing over a byte stream, one byte at a time
// ABOUTME: JSON string quoting/escaping is deliberately not honored — faithful to the source protocol

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Outcome of one [`FrameReader::read_frame`] call.
#[derive(Debug)]
pub enum FrameOutcome {
    /// A complete, brace-balanced frame.
    Frame(Bytes),
    /// No frame available: the stream ended cleanly before any byte of a
    /// new frame was read.
    End,
}

/// Fatal per-connection framing failures. Both variants mean the connection
/// must be destroyed with no enqueue.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The first non-CR/LF byte of a new frame was not `{`.
    #[error("unexpected leading byte {0:#04x}, expected '{{'")]
    BadLeadingByte(u8),
    /// The stream ended (or errored) after a frame had started but before
    /// its braces balanced.
    #[error("connection closed mid-frame")]
    PartialFrame,
    /// The underlying socket read itself failed.
    #[error("I/O error reading frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads brace-balanced JSON frames from an async byte stream, one byte at
/// a time rather than by scanning a filled buffer — this keeps the
/// "partial read mid-frame is fatal, no read at all is `End`" distinction
/// exact.
///
/// CR (`0x0D`) and LF (`0x0A`) bytes preceding the opening `{` are skipped
/// iteratively, not recursively, to avoid unbounded stack growth on a
/// stream of nothing but line endings, and to tolerate telnet-style line
/// endings.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }

    async fn read_one_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = self.stream.read(&mut byte).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(byte[0]))
        }
    }

    /// Read and return the next complete frame, or report that the stream
    /// ended cleanly.
    pub async fn read_frame(&mut self) -> Result<FrameOutcome, FrameError> {
        let opening = loop {
            match self.read_one_byte().await? {
                None => return Ok(FrameOutcome::End),
                Some(b'\n') | Some(b'\r') => continue,
                Some(b'{') => break b'{',
                Some(other) => return Err(FrameError::BadLeadingByte(other)),
            }
        };

        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(&[opening]);
        let mut nest_count: i64 = 1;

        loop {
            match self.read_one_byte().await? {
                None => return Err(FrameError::PartialFrame),
                Some(byte) => {
                    buffer.extend_from_slice(&[byte]);
                    match byte {
                        b'{' => nest_count += 1,
                        b'}' => nest_count -= 1,
                        _ => {}
                    }
                    if nest_count == 0 {
                        return Ok(FrameOutcome::Frame(buffer.freeze()));
                    }
                }
            }
        }
    }
}
