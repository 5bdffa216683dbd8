//! Unsolicited result codes
//!
//! A URC has the shape `+TOKEN: payload`. The token selects the notification
//! kind; tokens the driver does not act on map to [`Urc::Unrecognized`] so
//! that a new firmware notification never fails a command.
//!
//! # Recognized tokens
//! - `CSCON` - signaling connection state (`+CSCON: 1`, query form `+CSCON: 0,1`)
//! - `CEREG` - EPS registration status (`+CEREG: 5`, query form `+CEREG: 3,5,...`)
//! - `CGPADDR` - IP address assignment (`+CGPADDR: 0,"10.0.0.1"`)
//! - `NSONMI` - socket message indicator (`+NSONMI: 0,12`)
//! - `NPSMR` - power saving mode report (`+NPSMR: 1`)
//! - `CME ERROR` - verbose module error

use crate::error::ParseError;

/// EPS network registration status (3GPP TS 27.007 `<stat>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationStatus {
    /// 0 - not registered, not searching
    NotRegistered,
    /// 1 - registered, home network
    Home,
    /// 2 - not registered, searching
    Searching,
    /// 3 - registration denied
    Denied,
    /// 4 - unknown (out of coverage)
    Unknown,
    /// 5 - registered, roaming
    Roaming,
    /// Any other reported value, kept as-is
    Other(u8),
}

impl RegistrationStatus {
    /// Map a numeric status code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::NotRegistered,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            4 => Self::Unknown,
            5 => Self::Roaming,
            other => Self::Other(other),
        }
    }

    /// The numeric status code as reported by the module
    pub fn code(&self) -> u8 {
        match self {
            Self::NotRegistered => 0,
            Self::Home => 1,
            Self::Searching => 2,
            Self::Denied => 3,
            Self::Unknown => 4,
            Self::Roaming => 5,
            Self::Other(code) => *code,
        }
    }

    /// Returns whether the module is attached (home or roaming)
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// A parsed unsolicited result code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Urc {
    /// Signaling connection state changed
    SignalingConnection { connected: bool },
    /// EPS registration status changed (or was reported by a query)
    Registration { status: RegistrationStatus },
    /// IP address assigned to a PDP context (`None` when no address is held)
    IpAddress(Option<String>),
    /// A datagram is waiting; the descriptor is `<socket>,<length>`
    MessageIndicator(String),
    /// Power saving mode entered or left
    PowerSaving { active: bool },
    /// Verbose module error; carries the raw notification text
    CmeError(String),
    /// Any token the driver does not act on
    Unrecognized { token: String, raw: String },
}

impl Urc {
    /// Parse a `+`-prefixed line
    ///
    /// Unknown tokens are not an error. A known token with a payload that
    /// cannot be interpreted is.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let body = line
            .strip_prefix('+')
            .ok_or_else(|| ParseError::InvalidLine(line.to_string()))?;

        let (token, payload) = match body.find(':') {
            Some(pos) => (&body[..pos], body[pos + 1..].trim()),
            None => (body.trim(), ""),
        };

        match token {
            "CSCON" => {
                let state = last_field(payload);
                Ok(Urc::SignalingConnection {
                    connected: parse_code(state, line)? != 0,
                })
            }
            "CEREG" => Ok(Urc::Registration {
                status: Self::parse_registration(payload, line)?,
            }),
            "CGPADDR" => Ok(Urc::IpAddress(Self::parse_address(payload))),
            "NSONMI" => {
                if payload.is_empty() {
                    return Err(ParseError::InvalidLine(line.to_string()));
                }
                Ok(Urc::MessageIndicator(payload.to_string()))
            }
            "NPSMR" => Ok(Urc::PowerSaving {
                active: parse_code(first_field(payload), line)? != 0,
            }),
            "CME ERROR" => Ok(Urc::CmeError(line.to_string())),
            _ => Ok(Urc::Unrecognized {
                token: token.to_string(),
                raw: line.to_string(),
            }),
        }
    }

    /// Extract the status from either CEREG shape
    ///
    /// Notification: `<stat>[,"<tac>","<ci>",<AcT>]`.
    /// Query answer: `<n>,<stat>[,...]`, recognised by an unquoted second field.
    fn parse_registration(payload: &str, line: &str) -> Result<RegistrationStatus, ParseError> {
        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();

        let stat = match fields.get(1) {
            Some(second) if !second.is_empty() && !second.starts_with('"') => *second,
            _ => fields[0],
        };

        Ok(RegistrationStatus::from_code(parse_code(stat, line)?))
    }

    /// Extract the address from `<cid>,"<addr>"` or `<cid>,<addr>`
    fn parse_address(payload: &str) -> Option<String> {
        if let Some(start) = payload.find('"') {
            let rest = &payload[start + 1..];
            let end = rest.find('"').unwrap_or(rest.len());
            let addr = &rest[..end];
            return (!addr.is_empty()).then(|| addr.to_string());
        }

        payload
            .split_once(',')
            .map(|(_, addr)| addr.trim())
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
    }

    /// Returns the token name used for logging
    pub fn token(&self) -> &str {
        match self {
            Urc::SignalingConnection { .. } => "CSCON",
            Urc::Registration { .. } => "CEREG",
            Urc::IpAddress(_) => "CGPADDR",
            Urc::MessageIndicator(_) => "NSONMI",
            Urc::PowerSaving { .. } => "NPSMR",
            Urc::CmeError(_) => "CME ERROR",
            Urc::Unrecognized { token, .. } => token,
        }
    }
}

fn first_field(payload: &str) -> &str {
    payload.split(',').next().unwrap_or("").trim()
}

fn last_field(payload: &str) -> &str {
    payload.rsplit(',').next().unwrap_or("").trim()
}

fn parse_code(field: &str, line: &str) -> Result<u8, ParseError> {
    field
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidLine(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signaling_connection() {
        assert_eq!(
            Urc::parse("+CSCON: 1"),
            Ok(Urc::SignalingConnection { connected: true })
        );
        assert_eq!(
            Urc::parse("+CSCON: 0"),
            Ok(Urc::SignalingConnection { connected: false })
        );
    }

    #[test]
    fn test_parse_signaling_connection_query_answer() {
        assert_eq!(
            Urc::parse("+CSCON: 1,0"),
            Ok(Urc::SignalingConnection { connected: false })
        );
    }

    #[test]
    fn test_parse_registration_notification() {
        assert_eq!(
            Urc::parse("+CEREG: 5"),
            Ok(Urc::Registration {
                status: RegistrationStatus::Roaming
            })
        );
    }

    #[test]
    fn test_parse_registration_extended_notification() {
        assert_eq!(
            Urc::parse("+CEREG: 1,\"4A2B\",\"01A2D101\",9"),
            Ok(Urc::Registration {
                status: RegistrationStatus::Home
            })
        );
    }

    #[test]
    fn test_parse_registration_query_answer() {
        assert_eq!(
            Urc::parse("+CEREG: 3,5,\"4A2B\",\"01A2D101\",9"),
            Ok(Urc::Registration {
                status: RegistrationStatus::Roaming
            })
        );
        assert_eq!(
            Urc::parse("+CEREG: 1,0"),
            Ok(Urc::Registration {
                status: RegistrationStatus::NotRegistered
            })
        );
    }

    #[test]
    fn test_unusual_registration_code_is_kept() {
        let urc = Urc::parse("+CEREG: 8").unwrap();
        match urc {
            Urc::Registration { status } => {
                assert_eq!(status, RegistrationStatus::Other(8));
                assert_eq!(status.code(), 8);
                assert!(!status.is_registered());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_ip_address() {
        assert_eq!(
            Urc::parse("+CGPADDR: 0,\"10.160.14.7\""),
            Ok(Urc::IpAddress(Some("10.160.14.7".into())))
        );
        assert_eq!(
            Urc::parse("+CGPADDR: 0,10.160.14.7"),
            Ok(Urc::IpAddress(Some("10.160.14.7".into())))
        );
        assert_eq!(Urc::parse("+CGPADDR: 0"), Ok(Urc::IpAddress(None)));
    }

    #[test]
    fn test_parse_message_indicator() {
        assert_eq!(
            Urc::parse("+NSONMI: 0,12"),
            Ok(Urc::MessageIndicator("0,12".into()))
        );
        assert!(Urc::parse("+NSONMI:").is_err());
    }

    #[test]
    fn test_parse_power_saving() {
        assert_eq!(
            Urc::parse("+NPSMR: 1"),
            Ok(Urc::PowerSaving { active: true })
        );
    }

    #[test]
    fn test_parse_cme_error_keeps_text() {
        assert_eq!(
            Urc::parse("+CME ERROR: operation not allowed"),
            Ok(Urc::CmeError("+CME ERROR: operation not allowed".into()))
        );
    }

    #[test]
    fn test_unrecognized_token() {
        let urc = Urc::parse("+UUSOCL: 0").unwrap();
        assert_eq!(
            urc,
            Urc::Unrecognized {
                token: "UUSOCL".into(),
                raw: "+UUSOCL: 0".into()
            }
        );
        assert_eq!(urc.token(), "UUSOCL");
    }

    #[test]
    fn test_malformed_known_token() {
        assert!(Urc::parse("+CSCON: x").is_err());
        assert!(Urc::parse("+CEREG:").is_err());
        assert!(Urc::parse("CEREG: 1").is_err());
    }
}
