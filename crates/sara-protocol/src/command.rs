//! AT command encoding
//!
//! Every command the driver issues is a variant of [`AtCommand`]. The text
//! form (via `Display`) is what the module echoes back; [`EncodeCommand`]
//! adds the CR-LF terminator for the wire.

use std::fmt;

use crate::codec::terminate;
use crate::error::ParseError;
use crate::EncodeCommand;

/// Radio access technology selectable on SARA-R4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadioAccessTechnology {
    /// LTE Cat NB1
    NbIot,
    /// LTE Cat M1
    LteM,
}

impl RadioAccessTechnology {
    /// `AT+URAT` selector value
    pub fn urat_value(&self) -> u8 {
        match self {
            Self::LteM => 7,
            Self::NbIot => 8,
        }
    }

    /// `AT+UBANDMASK` RAT index
    pub fn bandmask_index(&self) -> u8 {
        match self {
            Self::LteM => 0,
            Self::NbIot => 1,
        }
    }

    /// Returns a human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::NbIot => "NB-IoT",
            Self::LteM => "LTE-M",
        }
    }
}

/// Transport protocol of a module socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SocketProtocol {
    /// Datagram socket
    Udp,
    /// Stream socket
    Tcp,
}

impl SocketProtocol {
    /// IANA protocol number used by the socket create commands
    pub fn number(&self) -> u8 {
        match self {
            Self::Udp => 17,
            Self::Tcp => 6,
        }
    }

    /// Returns a human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

/// An AT command understood by at least one SARA module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Reboot (N211): `AT+NRB`
    Reboot,
    /// Set phone functionality: `AT+CFUN=<fun>` (1 = full, 15 = silent reset on R4)
    SetFunctionality(u8),
    /// Enable signaling connection URCs: `AT+CSCON=1`
    EnableSignalingUrc,
    /// Query signaling connection: `AT+CSCON?`
    QuerySignaling,
    /// Configure registration URCs: `AT+CEREG=<n>`
    EnableRegistrationUrc(u8),
    /// Query registration status: `AT+CEREG?`
    QueryRegistration,
    /// Enable power saving mode reports: `AT+NPSMR=1`
    EnablePowerSavingReports,
    /// Manual operator selection: `AT+COPS=1,2,"<plmn>"`
    SelectOperator { plmn: String },
    /// Read PDP addresses: `AT+CGPADDR`
    GetIpAddress,
    /// Define PDP context: `AT+CGDCONT=<cid>,"IP","<apn>"`
    SetPdpContext { cid: u8, apn: String },
    /// Verbose error reporting: `AT+CMEE=2`
    EnableVerboseErrors,
    /// Select radio access technology: `AT+URAT=<n>`
    SetRadioAccessTechnology(RadioAccessTechnology),
    /// Restrict bands: `AT+UBANDMASK=<rat>,<mask>`
    SetBandMask { rat: RadioAccessTechnology, mask: u64 },
    /// Enable cell quality reporting in `AT+UCGED?`: `AT+UCGED=5`
    EnableQualityReporting,
    /// Hex payload format for socket data: `AT+UDCONF=1,1`
    EnableHexPayload,
    /// Read IMEI: `AT+CGSN`
    GetImei,
    /// Radio statistics (N211): `AT+NUESTATS="RADIO"`
    GetRadioStatistics,
    /// Cell environment description (R4): `AT+UCGED?`
    GetCellEnvironment,
    /// Create socket (N211): `AT+NSOCR="DGRAM",17,<port>`
    CreateDatagramSocket { port: u16 },
    /// Create socket (R4): `AT+USOCR=<protocol>[,<port>]`
    CreateSocket {
        protocol: SocketProtocol,
        port: Option<u16>,
    },
    /// Close socket (N211): `AT+NSOCL=<id>`
    CloseDatagramSocket { id: u8 },
    /// Close socket (R4): `AT+USOCL=<id>`
    CloseSocket { id: u8 },
    /// Listen on a port (R4): `AT+USOLI=<id>,<port>`
    Listen { id: u8, port: u16 },
    /// Send datagram (N211): `AT+NSOST=<id>,"<host>",<port>,<len>,"<hex>"`
    SendDatagram {
        id: u8,
        host: String,
        port: u16,
        payload: Vec<u8>,
    },
    /// Send datagram (R4): `AT+USOST=<id>,"<host>",<port>,<len>,"<hex>"`
    SendTo {
        id: u8,
        host: String,
        port: u16,
        payload: Vec<u8>,
    },
    /// Read pending datagram (N211): `AT+NSORF=<socket>,<length>`
    ReadDatagram { descriptor: String },
    /// Read datagram (R4): `AT+USORF=<id>,<length>`
    ReceiveFrom { id: u8, length: usize },
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Reboot => write!(f, "AT+NRB"),
            AtCommand::SetFunctionality(fun) => write!(f, "AT+CFUN={}", fun),
            AtCommand::EnableSignalingUrc => write!(f, "AT+CSCON=1"),
            AtCommand::QuerySignaling => write!(f, "AT+CSCON?"),
            AtCommand::EnableRegistrationUrc(n) => write!(f, "AT+CEREG={}", n),
            AtCommand::QueryRegistration => write!(f, "AT+CEREG?"),
            AtCommand::EnablePowerSavingReports => write!(f, "AT+NPSMR=1"),
            AtCommand::SelectOperator { plmn } => write!(f, "AT+COPS=1,2,\"{}\"", plmn),
            AtCommand::GetIpAddress => write!(f, "AT+CGPADDR"),
            AtCommand::SetPdpContext { cid, apn } => {
                write!(f, "AT+CGDCONT={},\"IP\",\"{}\"", cid, apn)
            }
            AtCommand::EnableVerboseErrors => write!(f, "AT+CMEE=2"),
            AtCommand::SetRadioAccessTechnology(rat) => write!(f, "AT+URAT={}", rat.urat_value()),
            AtCommand::SetBandMask { rat, mask } => {
                write!(f, "AT+UBANDMASK={},{}", rat.bandmask_index(), mask)
            }
            AtCommand::EnableQualityReporting => write!(f, "AT+UCGED=5"),
            AtCommand::EnableHexPayload => write!(f, "AT+UDCONF=1,1"),
            AtCommand::GetImei => write!(f, "AT+CGSN"),
            AtCommand::GetRadioStatistics => write!(f, "AT+NUESTATS=\"RADIO\""),
            AtCommand::GetCellEnvironment => write!(f, "AT+UCGED?"),
            AtCommand::CreateDatagramSocket { port } => {
                write!(f, "AT+NSOCR=\"DGRAM\",17,{}", port)
            }
            AtCommand::CreateSocket { protocol, port } => {
                write!(f, "AT+USOCR={}", protocol.number())?;
                if let Some(port) = port {
                    write!(f, ",{}", port)?;
                }
                Ok(())
            }
            AtCommand::CloseDatagramSocket { id } => write!(f, "AT+NSOCL={}", id),
            AtCommand::CloseSocket { id } => write!(f, "AT+USOCL={}", id),
            AtCommand::Listen { id, port } => write!(f, "AT+USOLI={},{}", id, port),
            AtCommand::SendDatagram {
                id,
                host,
                port,
                payload,
            } => write_send(f, "AT+NSOST", *id, host, *port, payload),
            AtCommand::SendTo {
                id,
                host,
                port,
                payload,
            } => write_send(f, "AT+USOST", *id, host, *port, payload),
            AtCommand::ReadDatagram { descriptor } => write!(f, "AT+NSORF={}", descriptor),
            AtCommand::ReceiveFrom { id, length } => write!(f, "AT+USORF={},{}", id, length),
        }
    }
}

fn write_send(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    id: u8,
    host: &str,
    port: u16,
    payload: &[u8],
) -> fmt::Result {
    write!(
        f,
        "{}={},\"{}\",{},{},\"{}\"",
        prefix,
        id,
        host,
        port,
        payload.len(),
        crate::payload::encode_payload(payload)
    )
}

impl EncodeCommand for AtCommand {
    fn encode(&self) -> Vec<u8> {
        terminate(self.to_string().as_bytes())
    }
}

/// Compute the band mask for a set of LTE bands
///
/// Band `b` sets bit `b - 1`, so bands 1 and 3 give `0b101`.
pub fn band_mask(bands: &[u8]) -> Result<u64, ParseError> {
    bands.iter().try_fold(0u64, |mask, &band| {
        if band == 0 || band > 64 {
            return Err(ParseError::BandOutOfRange(band));
        }
        Ok(mask | 1u64 << (band - 1))
    })
}
