//! Line transport adapter
//!
//! Thin wrapper over the byte stream: writes CR-LF terminated commands and
//! reads one terminated line at a time against a deadline. No classification
//! happens here.

use std::io::ErrorKind;

use sara_protocol::codec::terminate;
use sara_protocol::LineCodec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use crate::error::ModemError;

/// Line-oriented view of a duplex byte stream
pub struct LineTransport<T> {
    io: T,
    codec: LineCodec,
    buffer: Vec<u8>,
}

impl<T> LineTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a byte stream
    pub fn new(io: T) -> Self {
        Self {
            io,
            codec: LineCodec::new(),
            buffer: vec![0u8; 1024],
        }
    }

    /// Write a command, appending the terminator if absent
    pub async fn write_line(&mut self, data: &[u8]) -> Result<(), ModemError> {
        let data = terminate(data);
        self.io.write_all(&data).await?;
        self.io.flush().await?;
        trace!("Sent: {:?}", String::from_utf8_lossy(&data));
        Ok(())
    }

    /// Read the next line, terminator stripped
    ///
    /// When the deadline passes, any partially received line is discarded so
    /// that it cannot prefix the reply to the next command.
    pub async fn read_line(&mut self, deadline: Instant) -> Result<String, ModemError> {
        let started = Instant::now();
        loop {
            if let Some(line) = self.codec.next_line() {
                trace!("Received: {:?}", line);
                return Ok(line);
            }

            match timeout_at(deadline, self.io.read(&mut self.buffer)).await {
                Ok(Ok(0)) => return Err(ModemError::Closed),
                Ok(Ok(n)) => self.codec.push_bytes(&self.buffer[..n]),
                Ok(Err(e)) if e.kind() == ErrorKind::WouldBlock => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    if self.codec.has_partial() {
                        trace!("Discarding partial line after deadline");
                    }
                    self.codec.clear();
                    return Err(ModemError::Timeout {
                        operation: "line".into(),
                        timeout_ms: deadline.saturating_duration_since(started).as_millis() as u64,
                    });
                }
            }
        }
    }

    /// Consume the adapter and return the underlying stream
    pub fn into_inner(self) -> T {
        self.io
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_write_appends_terminator() {
        let (client, mut module) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        transport.write_line(b"AT+CFUN=1").await.unwrap();

        let mut buf = [0u8; 16];
        let n = module.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"AT+CFUN=1\r\n");
    }

    #[tokio::test]
    async fn test_read_line_strips_terminator() {
        let (client, mut module) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        module.write_all(b"+CSCON: 1\r\nOK\r\n").await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(200);
        assert_eq!(transport.read_line(deadline).await.unwrap(), "+CSCON: 1");
        assert_eq!(transport.read_line(deadline).await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_timeout_discards_partial_line() {
        let (client, mut module) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);

        module.write_all(b"+CER").await.unwrap();
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = transport.read_line(deadline).await.unwrap_err();
        assert!(err.is_timeout());

        module.write_all(b"OK\r\n").await.unwrap();
        let deadline = Instant::now() + Duration::from_millis(200);
        assert_eq!(transport.read_line(deadline).await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, module) = tokio::io::duplex(256);
        let mut transport = LineTransport::new(client);
        drop(module);

        let deadline = Instant::now() + Duration::from_millis(200);
        assert!(matches!(
            transport.read_line(deadline).await,
            Err(ModemError::Closed)
        ));
    }
}
