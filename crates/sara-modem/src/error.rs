//! Error types for the modem engine

use sara_protocol::{ModuleVariant, ParseError};
use thiserror::Error;

/// Errors that can occur while driving a module
#[derive(Debug, Error)]
pub enum ModemError {
    /// The expected empty line or echo did not follow a write
    #[error("no acknowledgement for {command:?}: received {received:?}")]
    Ack { command: String, received: String },

    /// The module answered with a terminal `ERROR`
    #[error("command {command:?} failed: {response}")]
    Command { command: String, response: String },

    /// The module reported a verbose `+CME ERROR` mid-exchange
    #[error("module error: {0}")]
    Module(String),

    /// A line read or the whole exchange exceeded its deadline
    #[error("timeout after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Network registration did not complete within the connection budget
    #[error("network registration not reached within {elapsed_secs}s")]
    ConnectionTimeout { elapsed_secs: u64 },

    /// Feature not available on the attached module generation
    #[error("{variant} does not support {feature}")]
    Unsupported {
        variant: ModuleVariant,
        feature: String,
    },

    /// Socket id not present in the socket table
    #[error("socket {0} not found")]
    SocketNotFound(u8),

    /// The module handed out an id the socket table still holds
    #[error("socket {0} is already open")]
    SocketInUse(u8),

    /// Receive attempted before the socket sent or was bound
    #[error("socket {0} has neither sent nor been bound")]
    SocketNotReady(u8),

    /// The transport reached end of stream
    #[error("transport closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Module output could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}

impl ModemError {
    /// Returns true for both the per-command and the connection timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ConnectionTimeout { .. })
    }
}
