//! SARA AT Protocol Library
//!
//! This crate provides line framing, classification and encoding for the
//! textual AT command protocol spoken by u-blox SARA cellular modules:
//!
//! - **SARA-N211**: NB-IoT module with the `N`-prefixed socket command set
//! - **SARA-R4**: LTE-M / NB-IoT module with the `U`-prefixed socket command set
//!
//! # Architecture
//!
//! The crate is I/O free. It provides:
//! - A streaming [`LineCodec`] that splits the byte stream on CR-LF
//! - [`Line`] classification into terminal markers, URCs and IRCs
//! - [`Urc`] parsing of the unsolicited notifications the driver reacts to
//! - [`AtCommand`] encoding of every command the driver issues
//! - Parsers for radio statistics and socket read replies
//!
//! The same text can mean different things depending on context:
//! - `+CEREG: 5` mid-exchange = URC (registration changed to roaming)
//! - `+CEREG: 3,5,...` after `AT+CEREG?` = query answer in URC shape
//! - `+USOCR: 0` after `AT+USOCR=17` = socket id in URC shape
//!
//! # Example
//!
//! ```rust
//! use sara_protocol::{Line, LineCodec, Urc};
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"\r\n+CSCON: 1\r\n\r\nOK\r\n");
//!
//! assert_eq!(codec.next_line().as_deref(), Some(""));
//! let line = codec.next_line().unwrap();
//!
//! if let Line::Urc(raw) = Line::classify(&line) {
//!     assert_eq!(Urc::parse(&raw), Ok(Urc::SignalingConnection { connected: true }));
//! }
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod line;
pub mod payload;
pub mod stats;
pub mod urc;

pub use codec::LineCodec;
pub use command::{band_mask, AtCommand, RadioAccessTechnology, SocketProtocol};
pub use error::ParseError;
pub use line::Line;
pub use payload::{decode_payload, encode_payload, parse_socket_id, ReadReply};
pub use stats::{RadioStatistic, SignalQuality, SignalQualityKind};
pub use urc::{RegistrationStatus, Urc};

/// Identifies which SARA module generation is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModuleVariant {
    /// SARA-N211 (NB-IoT only, 9600 baud, indicator-driven receive)
    SaraN211,
    /// SARA-R4 (LTE-M and NB-IoT, 115200 baud, polled receive)
    SaraR4,
}

impl ModuleVariant {
    /// Returns a human-readable name for the module
    pub fn name(&self) -> &'static str {
        match self {
            ModuleVariant::SaraN211 => "SARA-N211",
            ModuleVariant::SaraR4 => "SARA-R4",
        }
    }
}

impl std::fmt::Display for ModuleVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format, including the line terminator
    fn encode(&self) -> Vec<u8>;
}
