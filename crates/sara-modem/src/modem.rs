//! Command/response engine
//!
//! [`Modem`] owns the transport, the module state and the socket table. Every
//! public operation takes `&mut self`, so at most one command is ever in
//! flight on a module; URCs that arrive while a command is outstanding are
//! applied to the state before the command returns.

use std::time::Duration;

use sara_protocol::{
    band_mask, AtCommand, EncodeCommand, Line, ModuleVariant, ParseError, RadioAccessTechnology,
    RadioStatistic, RegistrationStatus, SignalQuality, Urc,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ModemConfig;
use crate::connection::ConnectionState;
use crate::dispatch::dispatch_line;
use crate::error::ModemError;
use crate::socket::SocketTable;
use crate::state::{ModuleState, RadioStatistics};
use crate::transport::LineTransport;
use crate::variant::VariantProfile;

/// PDP context the driver configures
const DEFAULT_CID: u8 = 1;

/// Options applied by [`Modem::setup`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupOptions {
    /// Radio access technology to select (SARA-R4)
    pub rat: Option<RadioAccessTechnology>,
    /// APN for the default PDP context (SARA-R4)
    pub apn: Option<String>,
    /// Permitted LTE bands (SARA-R4); empty leaves the module default
    pub bands: Vec<u8>,
}

/// How a line loop ends successfully
#[derive(Debug, Clone, Copy)]
enum Terminator<'a> {
    /// An exact `OK` line
    Ok,
    /// Any line containing the pattern (URCs are dispatched first)
    Contains(&'a str),
}

/// A driven SARA module
pub struct Modem<T> {
    transport: LineTransport<T>,
    pub(crate) profile: VariantProfile,
    pub(crate) config: ModemConfig,
    echo: bool,
    pub(crate) state: ModuleState,
    pub(crate) sockets: SocketTable,
    pub(crate) connection: ConnectionState,
}

impl<T> Modem<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Drive a module over an already opened stream
    pub fn new(io: T, variant: ModuleVariant, config: ModemConfig) -> Self {
        let profile = VariantProfile::for_variant(variant);
        let echo = config.echo.unwrap_or(profile.echo);
        Self {
            transport: LineTransport::new(io),
            profile,
            config,
            echo,
            state: ModuleState::new(),
            sockets: SocketTable::new(),
            connection: ConnectionState::Disconnected,
        }
    }

    pub fn variant(&self) -> ModuleVariant {
        self.profile.variant
    }

    pub fn profile(&self) -> &VariantProfile {
        &self.profile
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub fn sockets(&self) -> &SocketTable {
        &self.sockets
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Release the underlying stream
    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }

    /// Send a command and collect its intermediate responses
    ///
    /// Lines starting with `+` are dispatched as notifications unless
    /// `capture_urcs` is set, in which case they are returned like any other
    /// response line. A `+CME ERROR` always fails the command.
    pub async fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
        capture_urcs: bool,
    ) -> Result<Vec<String>, ModemError> {
        self.exchange(command, command.as_bytes(), timeout, capture_urcs)
            .await
    }

    /// Run a command with the configured command timeout
    pub async fn at(&mut self, command: &AtCommand) -> Result<Vec<String>, ModemError> {
        let timeout = self.config.command_timeout();
        self.exchange(&command.to_string(), &command.encode(), timeout, false)
            .await
    }

    /// Write `wire` and correlate the reply against its text form `command`
    async fn exchange(
        &mut self,
        command: &str,
        wire: &[u8],
        timeout: Duration,
        capture_urcs: bool,
    ) -> Result<Vec<String>, ModemError> {
        debug!("Applying AT command: {}", command);
        let deadline = Instant::now() + timeout;

        self.transport.write_line(wire).await?;
        self.read_acknowledgement(command, deadline, timeout).await?;

        let ircs = self
            .collect(command, deadline, timeout, capture_urcs, Terminator::Ok)
            .await?;
        debug!("AT command response = {:?}", ircs);
        Ok(ircs)
    }

    /// Run a command whose answer arrives in URC shape
    ///
    /// Lines starting with one of `prefixes` are returned with the plain
    /// responses; any other notification is dispatched once the exchange
    /// completes.
    pub async fn at_capture(
        &mut self,
        command: &AtCommand,
        prefixes: &[&str],
    ) -> Result<Vec<String>, ModemError> {
        let timeout = self.config.command_timeout();
        let lines = self
            .exchange(&command.to_string(), &command.encode(), timeout, true)
            .await?;

        let mut ircs = Vec::with_capacity(lines.len());
        for line in lines {
            if line.starts_with('+') && !prefixes.iter().any(|p| line.starts_with(p)) {
                dispatch_line(&mut self.state, &line)?;
            } else {
                ircs.push(line);
            }
        }
        Ok(ircs)
    }

    /// Read lines without sending anything until one contains `pattern`
    ///
    /// Notifications are dispatched along the way, including the one that
    /// matches. `OK` lines are not terminal here. `operation` names what is
    /// awaited in a timeout error.
    pub async fn read_until(
        &mut self,
        pattern: &str,
        operation: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, ModemError> {
        let deadline = Instant::now() + timeout;
        self.collect(operation, deadline, timeout, false, Terminator::Contains(pattern))
            .await
    }

    async fn read_acknowledgement(
        &mut self,
        command: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<(), ModemError> {
        let mut line = self.read_line(command, deadline, timeout).await?;

        // Notifications queued before the echo belong to no command
        while self.echo && (line.is_empty() || line.starts_with('+')) {
            if !line.is_empty() {
                dispatch_line(&mut self.state, &line)?;
            }
            line = self.read_line(command, deadline, timeout).await?;
        }

        // The echo is terminated by a lone CR which the framer leaves in place
        let acknowledged = if self.echo {
            line.strip_suffix('\r') == Some(command)
        } else {
            line.is_empty()
        };

        if acknowledged {
            Ok(())
        } else {
            Err(ModemError::Ack {
                command: command.to_string(),
                received: line,
            })
        }
    }

    async fn collect(
        &mut self,
        operation: &str,
        deadline: Instant,
        timeout: Duration,
        capture_urcs: bool,
        terminator: Terminator<'_>,
    ) -> Result<Vec<String>, ModemError> {
        let mut ircs = Vec::new();

        loop {
            let line = self.read_line(operation, deadline, timeout).await?;
            let matched = match terminator {
                Terminator::Contains(pattern) => line.contains(pattern),
                Terminator::Ok => false,
            };

            match Line::classify(&line) {
                Line::Ok => {
                    if let Terminator::Ok = terminator {
                        return Ok(ircs);
                    }
                }
                Line::Error(response) => {
                    return Err(ModemError::Command {
                        command: operation.to_string(),
                        response,
                    });
                }
                Line::Urc(raw) if capture_urcs => {
                    if let Ok(Urc::CmeError(text)) = Urc::parse(&raw) {
                        return Err(ModemError::Module(text));
                    }
                    ircs.push(raw);
                }
                Line::Urc(raw) => dispatch_line(&mut self.state, &raw)?,
                Line::Empty => {}
                Line::Response(text) => ircs.push(text),
            }

            if matched {
                return Ok(ircs);
            }
        }
    }

    async fn read_line(
        &mut self,
        operation: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        match self.transport.read_line(deadline).await {
            Err(ModemError::Timeout { .. }) => Err(ModemError::Timeout {
                operation: operation.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            other => other,
        }
    }

    pub(crate) fn require(&self, supported: bool, feature: &str) -> Result<(), ModemError> {
        if supported {
            Ok(())
        } else {
            Err(ModemError::Unsupported {
                variant: self.profile.variant,
                feature: feature.to_string(),
            })
        }
    }

    /// Reboot the module and forget all state learned from it
    pub async fn reboot(&mut self) -> Result<(), ModemError> {
        info!("Rebooting {}", self.profile.variant);
        let command = self.profile.reboot_command.clone();
        let timeout = self.config.reboot_timeout();
        self.exchange(&command.to_string(), &command.encode(), timeout, false)
            .await?;

        let settle = self
            .config
            .reboot_settle_ms
            .map(Duration::from_millis)
            .unwrap_or(self.profile.reboot_settle);
        if !settle.is_zero() {
            debug!("Waiting {:?} for the module to settle", settle);
            tokio::time::sleep(settle).await;
        }

        self.state.reset();
        self.sockets.clear();
        self.connection = ConnectionState::Disconnected;
        Ok(())
    }

    /// Run the variant's setup sequence
    ///
    /// Options the module cannot honour are rejected before anything is sent.
    pub async fn setup(&mut self, options: &SetupOptions) -> Result<(), ModemError> {
        let caps = self.profile.capabilities;
        if let Some(rat) = options.rat {
            self.require(self.profile.supports_rat(rat), rat.name())?;
        }
        if options.apn.is_some() {
            self.require(caps.pdp_context, "PDP context configuration")?;
        }
        if !options.bands.is_empty() {
            self.require(caps.band_mask, "band selection")?;
            band_mask(&options.bands)?;
        }

        info!("Starting setup of {}", self.profile.variant);

        if let Some(rat) = options.rat {
            self.set_radio_access_technology(rat).await?;
        }
        for command in self.profile.setup_commands() {
            self.at(&command).await?;
        }
        if let Some(apn) = &options.apn {
            self.set_pdp_context(apn).await?;
        }
        if !options.bands.is_empty() {
            self.set_band_mask(&options.bands).await?;
        }
        if caps.quality_reporting {
            self.enable_quality_reporting().await?;
        }

        info!("Finished setup of {}", self.profile.variant);
        Ok(())
    }

    /// Select NB-IoT or LTE-M
    pub async fn set_radio_access_technology(
        &mut self,
        rat: RadioAccessTechnology,
    ) -> Result<(), ModemError> {
        self.require(self.profile.supports_rat(rat), rat.name())?;
        if self.profile.capabilities.radio_access_technology {
            self.at(&AtCommand::SetRadioAccessTechnology(rat)).await?;
        }
        self.state.set_radio_access_technology(rat);
        Ok(())
    }

    /// Configure the APN of the default PDP context
    pub async fn set_pdp_context(&mut self, apn: &str) -> Result<(), ModemError> {
        self.require(self.profile.capabilities.pdp_context, "PDP context configuration")?;
        self.at(&AtCommand::SetPdpContext {
            cid: DEFAULT_CID,
            apn: apn.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Restrict the module to the given LTE bands; returns the mask sent
    pub async fn set_band_mask(&mut self, bands: &[u8]) -> Result<u64, ModemError> {
        self.require(self.profile.capabilities.band_mask, "band selection")?;
        let mask = band_mask(bands)?;
        let rat = self
            .state
            .radio_access_technology()
            .unwrap_or(RadioAccessTechnology::NbIot);
        self.at(&AtCommand::SetBandMask { rat, mask }).await?;
        Ok(mask)
    }

    /// Include RSRP/RSRQ of the serving cell in cell environment reports
    pub async fn enable_quality_reporting(&mut self) -> Result<(), ModemError> {
        self.require(self.profile.capabilities.quality_reporting, "quality reporting")?;
        self.at(&AtCommand::EnableQualityReporting).await?;
        Ok(())
    }

    /// Read the IMEI
    pub async fn imei(&mut self) -> Result<String, ModemError> {
        self.require(self.profile.capabilities.imei, "IMEI retrieval")?;
        let ircs = self.at(&AtCommand::GetImei).await?;
        let imei = ircs
            .iter()
            .map(|line| line.trim().trim_matches('"'))
            .find(|line| !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| ParseError::InvalidLine(ircs.join(" ")))?
            .to_string();
        self.state.set_imei(imei.clone());
        Ok(imei)
    }

    /// Query the PDP address; the answer updates the state
    pub async fn update_ip_address(&mut self) -> Result<Option<String>, ModemError> {
        self.at(&AtCommand::GetIpAddress).await?;
        Ok(self.state.ip_address().map(str::to_string))
    }

    /// Query the registration status; the answer updates the state
    pub async fn query_registration(&mut self) -> Result<Option<RegistrationStatus>, ModemError> {
        self.at(&AtCommand::QueryRegistration).await?;
        Ok(self.state.registration())
    }

    /// Query the signaling connection; the answer updates the state
    pub async fn query_signaling(&mut self) -> Result<bool, ModemError> {
        self.at(&AtCommand::QuerySignaling).await?;
        Ok(self.state.connected())
    }

    /// Refresh radio statistics
    ///
    /// A malformed line is logged and skipped; the fields it would have set
    /// keep their previous values.
    pub async fn update_radio_statistics(&mut self) -> Result<&RadioStatistics, ModemError> {
        let command = self.profile.statistics_command();

        match self.profile.variant {
            ModuleVariant::SaraN211 => {
                for line in self.at(&command).await? {
                    match RadioStatistic::parse(&line) {
                        Ok(Some(stat)) => {
                            if !self.state.radio_mut().apply(&stat) {
                                debug!("Unhandled statistics data: {:?}", stat);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Skipping statistics line: {}", e),
                    }
                }
            }
            ModuleVariant::SaraR4 => {
                for line in self.at_capture(&command, &["+RSRP:", "+RSRQ:"]).await? {
                    match SignalQuality::parse(&line) {
                        Ok(Some(quality)) => self.state.radio_mut().apply_quality(&quality),
                        Ok(None) => {}
                        Err(e) => warn!("Skipping statistics line: {}", e),
                    }
                }
            }
        }

        Ok(self.state.radio())
    }
}

impl<T> std::fmt::Debug for Modem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("variant", &self.profile.variant)
            .field("connection", &self.connection)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
