//! Error types for AT protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing module output
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line does not have the expected shape
    #[error("invalid line: {0}")]
    InvalidLine(String),

    /// Radio statistics line could not be parsed
    #[error("invalid statistic: {0}")]
    InvalidStatistic(String),

    /// Socket id missing or not numeric
    #[error("invalid socket id: {0}")]
    InvalidSocketId(String),

    /// Socket read reply has the wrong number or kind of fields
    #[error("invalid read reply: {0}")]
    InvalidReadReply(String),

    /// Payload is not valid hex
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),

    /// Band number outside the range the band mask can express
    #[error("band {0} out of range (1-64)")]
    BandOutOfRange(u8),
}
