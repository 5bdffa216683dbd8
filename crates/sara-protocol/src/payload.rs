//! Socket payload encoding and reply parsing
//!
//! Payloads always travel as uppercase hex text. Read replies share one field
//! layout across both modules, with an optional URC-style prefix on SARA-R4:
//!
//! - N211: `0,"10.0.0.1",5683,2,"6869",0` (socket,ip,port,length,data,remaining)
//! - R4:   `+USORF: 0,"10.0.0.1",5683,2,"6869"`
//! - R4 with nothing pending: `+USORF: 0,0`

use crate::error::ParseError;

/// Hex-encode a payload with uppercase digits
pub fn encode_payload(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex payload (either case)
pub fn decode_payload(text: &str) -> Result<Vec<u8>, ParseError> {
    hex::decode(text.trim_matches('"')).map_err(|e| ParseError::InvalidHex(e.to_string()))
}

/// Extract a module-assigned socket id from `0` or `+USOCR: 0`
pub fn parse_socket_id(line: &str) -> Result<u8, ParseError> {
    strip_urc_prefix(line)
        .trim()
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidSocketId(line.to_string()))
}

/// A datagram read back from the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    /// Socket the datagram arrived on
    pub socket: u8,
    /// Source address
    pub host: String,
    /// Source port
    pub port: u16,
    /// Decoded payload
    pub payload: Vec<u8>,
    /// Bytes still buffered in the module for this socket
    pub remaining: usize,
}

impl ReadReply {
    /// Parse a read reply
    ///
    /// Returns `Ok(None)` when the module reports that no data is pending.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let invalid = || ParseError::InvalidReadReply(line.to_string());

        let fields: Vec<&str> = strip_urc_prefix(line)
            .split(',')
            .map(|f| f.trim().trim_matches('"'))
            .collect();

        let socket = fields
            .first()
            .and_then(|f| f.parse::<u8>().ok())
            .ok_or_else(invalid)?;

        if fields.len() < 5 {
            // `<socket>,<length>` form with nothing to read
            return match fields.get(1).map(|f| f.parse::<usize>()) {
                Some(Ok(0)) => Ok(None),
                _ => Err(invalid()),
            };
        }

        let host = fields[1];
        let length = fields[3].parse::<usize>().map_err(|_| invalid())?;
        if host.is_empty() || length == 0 {
            return Ok(None);
        }

        let port = fields[2].parse::<u16>().map_err(|_| invalid())?;
        let payload = decode_payload(fields[4])?;
        if payload.len() != length {
            return Err(invalid());
        }

        let remaining = match fields.get(5) {
            Some(f) => f.parse::<usize>().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Some(Self {
            socket,
            host: host.to_string(),
            port,
            payload,
            remaining,
        }))
    }
}

fn strip_urc_prefix(line: &str) -> &str {
    if line.starts_with('+') {
        line.split_once(':').map(|(_, rest)| rest).unwrap_or(line)
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uppercase() {
        assert_eq!(encode_payload(b"hi"), "6869");
        assert_eq!(encode_payload(&[0xde, 0xad]), "DEAD");
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("6869"), Ok(b"hi".to_vec()));
        assert_eq!(decode_payload("\"dead\""), Ok(vec![0xde, 0xad]));
        assert!(decode_payload("XYZ").is_err());
    }

    #[test]
    fn test_parse_socket_id() {
        assert_eq!(parse_socket_id("0"), Ok(0));
        assert_eq!(parse_socket_id("+USOCR: 3"), Ok(3));
        assert!(parse_socket_id("OK").is_err());
    }

    #[test]
    fn test_parse_n211_read_reply() {
        let reply = ReadReply::parse("0,\"195.34.89.241\",7,2,\"6869\",0")
            .unwrap()
            .unwrap();
        assert_eq!(reply.socket, 0);
        assert_eq!(reply.host, "195.34.89.241");
        assert_eq!(reply.port, 7);
        assert_eq!(reply.payload, b"hi");
        assert_eq!(reply.remaining, 0);
    }

    #[test]
    fn test_parse_r4_read_reply() {
        let reply = ReadReply::parse("+USORF: 1,\"10.0.0.1\",9000,3,\"414243\"")
            .unwrap()
            .unwrap();
        assert_eq!(reply.socket, 1);
        assert_eq!(reply.payload, b"ABC");
        assert_eq!(reply.remaining, 0);
    }

    #[test]
    fn test_parse_empty_read_reply() {
        assert_eq!(ReadReply::parse("+USORF: 0,0"), Ok(None));
        assert_eq!(ReadReply::parse("+USORF: 0,\"\",0,0,\"\""), Ok(None));
    }

    #[test]
    fn test_parse_read_reply_length_mismatch() {
        assert!(ReadReply::parse("0,\"10.0.0.1\",7,3,\"6869\",0").is_err());
    }

    #[test]
    fn test_parse_read_reply_garbage() {
        assert!(ReadReply::parse("garbage").is_err());
        assert!(ReadReply::parse("+USORF: 0,4").is_err());
    }
}
