//! Module generation profiles
//!
//! Both generations share the engine; a [`VariantProfile`] carries the
//! differences as data (timing, command strings, capability flags) plus
//! strategy selectors for the few places where control flow differs.

use std::time::Duration;

use sara_protocol::{AtCommand, ModuleVariant, RadioAccessTechnology, SocketProtocol};

/// Where the module reports the id of a newly created socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketIdSource {
    /// A bare numeric IRC: `0`
    Irc,
    /// A URC-shaped line that must be captured: `+USOCR: 0`
    CapturedUrc,
}

/// How network registration is awaited after operator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitStrategy {
    /// Block on the line loop until `+CEREG: <stat>` arrives
    Notification,
    /// Poll `AT+CEREG?` until the status matches
    Polling,
}

/// How incoming datagrams are picked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStrategy {
    /// Wait for `+NSONMI`, then read the indicated message
    Indicator,
    /// Poll the read command until data appears (soft timeout)
    Polling,
}

/// Optional features layered on the shared engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub radio_access_technology: bool,
    pub band_mask: bool,
    pub pdp_context: bool,
    pub quality_reporting: bool,
    pub imei: bool,
    pub listen: bool,
}

/// Static description of one module generation
#[derive(Debug, Clone)]
pub struct VariantProfile {
    pub variant: ModuleVariant,
    pub baud_rate: u32,
    pub hardware_flow_control: bool,
    /// Whether the module echoes each command before replying
    pub echo: bool,
    /// Time the module needs after a reboot before accepting commands
    pub reboot_settle: Duration,
    pub reboot_command: AtCommand,
    pub socket_protocols: &'static [SocketProtocol],
    pub socket_id_source: SocketIdSource,
    pub await_strategy: AwaitStrategy,
    pub receive_strategy: ReceiveStrategy,
    pub capabilities: Capabilities,
}

impl VariantProfile {
    /// Profile for the given module generation
    pub fn for_variant(variant: ModuleVariant) -> Self {
        match variant {
            ModuleVariant::SaraN211 => Self {
                variant,
                baud_rate: 9600,
                hardware_flow_control: false,
                echo: false,
                reboot_settle: Duration::ZERO,
                reboot_command: AtCommand::Reboot,
                socket_protocols: &[SocketProtocol::Udp],
                socket_id_source: SocketIdSource::Irc,
                await_strategy: AwaitStrategy::Notification,
                receive_strategy: ReceiveStrategy::Indicator,
                capabilities: Capabilities::default(),
            },
            ModuleVariant::SaraR4 => Self {
                variant,
                baud_rate: 115_200,
                hardware_flow_control: true,
                echo: true,
                reboot_settle: Duration::from_secs(10),
                reboot_command: AtCommand::SetFunctionality(15),
                socket_protocols: &[SocketProtocol::Udp, SocketProtocol::Tcp],
                socket_id_source: SocketIdSource::CapturedUrc,
                await_strategy: AwaitStrategy::Polling,
                receive_strategy: ReceiveStrategy::Polling,
                capabilities: Capabilities {
                    radio_access_technology: true,
                    band_mask: true,
                    pdp_context: true,
                    quality_reporting: true,
                    imei: true,
                    listen: true,
                },
            },
        }
    }

    pub fn supports_protocol(&self, protocol: SocketProtocol) -> bool {
        self.socket_protocols.contains(&protocol)
    }

    /// Radio access technologies the module can be switched to
    pub fn supports_rat(&self, rat: RadioAccessTechnology) -> bool {
        self.capabilities.radio_access_technology || rat == RadioAccessTechnology::NbIot
    }

    /// Commands run by `Modem::setup` before any variant-specific options
    pub fn setup_commands(&self) -> Vec<AtCommand> {
        match self.variant {
            ModuleVariant::SaraN211 => vec![
                AtCommand::EnableSignalingUrc,
                AtCommand::EnableRegistrationUrc(1),
                AtCommand::EnablePowerSavingReports,
                AtCommand::SetFunctionality(1),
            ],
            ModuleVariant::SaraR4 => vec![
                AtCommand::EnableVerboseErrors,
                AtCommand::EnableRegistrationUrc(3),
                AtCommand::EnableHexPayload,
            ],
        }
    }

    pub fn create_socket_command(&self, protocol: SocketProtocol, port: Option<u16>) -> AtCommand {
        match self.variant {
            // The N211 always binds a local port; callers supply one
            ModuleVariant::SaraN211 => AtCommand::CreateDatagramSocket {
                port: port.unwrap_or_default(),
            },
            ModuleVariant::SaraR4 => AtCommand::CreateSocket { protocol, port },
        }
    }

    pub fn close_socket_command(&self, id: u8) -> AtCommand {
        match self.variant {
            ModuleVariant::SaraN211 => AtCommand::CloseDatagramSocket { id },
            ModuleVariant::SaraR4 => AtCommand::CloseSocket { id },
        }
    }

    pub fn send_command(&self, id: u8, host: &str, port: u16, payload: &[u8]) -> AtCommand {
        let host = host.to_string();
        let payload = payload.to_vec();
        match self.variant {
            ModuleVariant::SaraN211 => AtCommand::SendDatagram {
                id,
                host,
                port,
                payload,
            },
            ModuleVariant::SaraR4 => AtCommand::SendTo {
                id,
                host,
                port,
                payload,
            },
        }
    }

    pub fn statistics_command(&self) -> AtCommand {
        match self.variant {
            ModuleVariant::SaraN211 => AtCommand::GetRadioStatistics,
            ModuleVariant::SaraR4 => AtCommand::GetCellEnvironment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n211_profile() {
        let profile = VariantProfile::for_variant(ModuleVariant::SaraN211);
        assert_eq!(profile.baud_rate, 9600);
        assert!(!profile.echo);
        assert!(profile.supports_protocol(SocketProtocol::Udp));
        assert!(!profile.supports_protocol(SocketProtocol::Tcp));
        assert!(profile.supports_rat(RadioAccessTechnology::NbIot));
        assert!(!profile.supports_rat(RadioAccessTechnology::LteM));
        assert_eq!(profile.reboot_command.to_string(), "AT+NRB");
    }

    #[test]
    fn test_r4_profile() {
        let profile = VariantProfile::for_variant(ModuleVariant::SaraR4);
        assert_eq!(profile.baud_rate, 115_200);
        assert!(profile.echo);
        assert!(profile.supports_protocol(SocketProtocol::Tcp));
        assert_eq!(profile.socket_id_source, SocketIdSource::CapturedUrc);
        assert_eq!(profile.await_strategy, AwaitStrategy::Polling);
        assert_eq!(profile.reboot_command.to_string(), "AT+CFUN=15");
    }

    #[test]
    fn test_variant_command_strings() {
        let n211 = VariantProfile::for_variant(ModuleVariant::SaraN211);
        let r4 = VariantProfile::for_variant(ModuleVariant::SaraR4);

        assert_eq!(n211.close_socket_command(2).to_string(), "AT+NSOCL=2");
        assert_eq!(r4.close_socket_command(2).to_string(), "AT+USOCL=2");
        assert_eq!(
            n211.statistics_command().to_string(),
            "AT+NUESTATS=\"RADIO\""
        );
        assert_eq!(r4.statistics_command().to_string(), "AT+UCGED?");
    }
}
