//! Streaming CR-LF line framing
//!
//! Module output is a sequence of lines terminated by `\r\n`. A command echo
//! is terminated by a lone `\r` and is therefore delivered as the start of the
//! following line (`AT+CFUN=1\r`), which is what the acknowledgement check in
//! the driver expects.

use tracing::warn;

/// Line terminator used in both directions
pub const TERMINATOR: &[u8] = b"\r\n";

/// Maximum line length (a full 512 byte hex read reply fits comfortably)
const MAX_LINE_LEN: usize = 4096;

/// Streaming line codec
#[derive(Debug)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create a new line codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > MAX_LINE_LEN * 2 && !self.contains_terminator() {
            // Keep only the last portion
            warn!(
                "Discarding {} bytes of unterminated module output",
                self.buffer.len() - MAX_LINE_LEN
            );
            let start = self.buffer.len() - MAX_LINE_LEN;
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    /// Try to extract the next complete line, with the terminator stripped
    pub fn next_line(&mut self) -> Option<String> {
        let term_pos = self.terminator_position()?;
        let raw: Vec<u8> = self.buffer.drain(..term_pos + TERMINATOR.len()).collect();
        Some(String::from_utf8_lossy(&raw[..term_pos]).into_owned())
    }

    /// Returns true if bytes of an unterminated line are buffered
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn contains_terminator(&self) -> bool {
        self.terminator_position().is_some()
    }

    fn terminator_position(&self) -> Option<usize> {
        self.buffer
            .windows(TERMINATOR.len())
            .position(|w| w == TERMINATOR)
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Append the line terminator to a command unless it already ends with one
pub fn terminate(command: &[u8]) -> Vec<u8> {
    let mut data = command.to_vec();
    if !data.ends_with(TERMINATOR) {
        data.extend_from_slice(TERMINATOR);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"OK\r\n");

        assert_eq!(codec.next_line().as_deref(), Some("OK"));
        assert!(codec.next_line().is_none());
        assert!(!codec.has_partial());
    }

    #[test]
    fn test_empty_acknowledgement_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"\r\nOK\r\n");

        assert_eq!(codec.next_line().as_deref(), Some(""));
        assert_eq!(codec.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_echo_keeps_trailing_carriage_return() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"AT+CFUN=1\r\r\nOK\r\n");

        assert_eq!(codec.next_line().as_deref(), Some("AT+CFUN=1\r"));
        assert_eq!(codec.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_streaming_parse() {
        let mut codec = LineCodec::new();

        codec.push_bytes(b"+CEREG");
        assert!(codec.next_line().is_none());
        assert!(codec.has_partial());

        codec.push_bytes(b": 5\r");
        assert!(codec.next_line().is_none());

        codec.push_bytes(b"\n");
        assert_eq!(codec.next_line().as_deref(), Some("+CEREG: 5"));
    }

    #[test]
    fn test_terminator_is_consumed() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"OK\r\n");

        assert_eq!(codec.next_line().as_deref(), Some("OK"));
        assert!(!codec.has_partial());
    }

    #[test]
    fn test_clear_discards_partial_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"+NSONMI: 0,");
        codec.clear();
        codec.push_bytes(b"OK\r\n");

        assert_eq!(codec.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_overlong_garbage_is_bounded() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&vec![b'A'; MAX_LINE_LEN * 3]);

        assert!(codec.buffer.len() <= MAX_LINE_LEN);
    }

    #[test]
    fn test_terminate() {
        assert_eq!(terminate(b"AT"), b"AT\r\n");
        assert_eq!(terminate(b"AT\r\n"), b"AT\r\n");
    }

    proptest! {
        #[test]
        fn framing_is_independent_of_chunking(split in 0usize..40) {
            let stream = b"\r\n+CSCON: 1\r\n\r\n0,\"10.0.0.1\",5683,2,\"6869\",0\r\n\r\nOK\r\n";
            let split = split.min(stream.len());

            let mut whole = LineCodec::new();
            whole.push_bytes(stream);
            let mut expected = Vec::new();
            while let Some(line) = whole.next_line() {
                expected.push(line);
            }

            let mut chunked = LineCodec::new();
            let mut actual = Vec::new();
            for chunk in [&stream[..split], &stream[split..]] {
                chunked.push_bytes(chunk);
                while let Some(line) = chunked.next_line() {
                    actual.push(line);
                }
            }

            prop_assert_eq!(expected, actual);
        }
    }
}
