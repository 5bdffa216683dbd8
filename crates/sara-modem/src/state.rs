//! Module and radio state tracking
//!
//! All fields are private and change through one setter each, so every
//! transition is logged and tests can assert exact values.

use std::collections::VecDeque;

use sara_protocol::{
    RadioAccessTechnology, RadioStatistic, RegistrationStatus, SignalQuality, SignalQualityKind,
};
use tracing::{debug, info};

/// Radio statistics reported by the module
///
/// Values are kept in the unit the module reports them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioStatistics {
    pub signal_power: Option<i64>,
    pub total_power: Option<i64>,
    pub tx_power: Option<i64>,
    pub tx_time: Option<i64>,
    pub rx_time: Option<i64>,
    pub cell_id: Option<i64>,
    pub ecl: Option<i64>,
    pub snr: Option<i64>,
    pub earfcn: Option<i64>,
    pub pci: Option<i64>,
    pub rsrq: Option<f64>,
    pub rsrp: Option<f64>,
}

impl RadioStatistics {
    /// Store a `(group, name, value)` statistic
    ///
    /// Returns false for pairs that are not tracked.
    pub fn apply(&mut self, stat: &RadioStatistic) -> bool {
        if stat.group != "RADIO" {
            return false;
        }

        let value = stat.value;
        match stat.name.as_str() {
            "Signal power" => self.signal_power = Some(value),
            "Total power" => self.total_power = Some(value),
            "TX power" => self.tx_power = Some(value),
            "TX time" => self.tx_time = Some(value),
            "RX time" => self.rx_time = Some(value),
            "Cell ID" => self.cell_id = Some(value),
            "ECL" => self.ecl = Some(value),
            "SNR" => self.snr = Some(value),
            "EARFCN" => self.earfcn = Some(value),
            "PCI" => self.pci = Some(value),
            "RSRQ" => self.rsrq = Some(value as f64),
            _ => return false,
        }
        true
    }

    /// Store a serving cell quality measurement
    pub fn apply_quality(&mut self, quality: &SignalQuality) {
        match quality.kind {
            SignalQualityKind::Rsrp => self.rsrp = Some(quality.value),
            SignalQualityKind::Rsrq => self.rsrq = Some(quality.value),
        }
        self.pci = Some(i64::from(quality.pci));
        self.earfcn = Some(i64::from(quality.earfcn));
    }
}

/// Mutable state of one attached module
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    connected: bool,
    registration: Option<RegistrationStatus>,
    ip_address: Option<String>,
    power_saving: bool,
    imei: Option<String>,
    radio_access_technology: Option<RadioAccessTechnology>,
    pending_messages: VecDeque<String>,
    radio: RadioStatistics,
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a signaling connection is up
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            info!("Signaling connection {}", if connected { "up" } else { "idle" });
        }
        self.connected = connected;
    }

    /// Last reported EPS registration status
    pub fn registration(&self) -> Option<RegistrationStatus> {
        self.registration
    }

    pub fn set_registration(&mut self, status: RegistrationStatus) {
        if self.registration != Some(status) {
            info!("EPS registration status = {}", status.code());
        }
        self.registration = Some(status);
    }

    /// Address of the default PDP context
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn set_ip_address(&mut self, address: Option<String>) {
        if self.ip_address != address {
            info!("IP address = {:?}", address);
        }
        self.ip_address = address;
    }

    /// Whether the module reported entering power saving mode
    pub fn power_saving(&self) -> bool {
        self.power_saving
    }

    pub fn set_power_saving(&mut self, active: bool) {
        debug!("Power saving mode {}", if active { "entered" } else { "left" });
        self.power_saving = active;
    }

    pub fn imei(&self) -> Option<&str> {
        self.imei.as_deref()
    }

    pub fn set_imei(&mut self, imei: String) {
        self.imei = Some(imei);
    }

    /// Radio access technology last selected through the driver
    pub fn radio_access_technology(&self) -> Option<RadioAccessTechnology> {
        self.radio_access_technology
    }

    pub fn set_radio_access_technology(&mut self, rat: RadioAccessTechnology) {
        info!("Radio access technology = {}", rat.name());
        self.radio_access_technology = Some(rat);
    }

    pub fn radio(&self) -> &RadioStatistics {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut RadioStatistics {
        &mut self.radio
    }

    /// Queue an incoming message descriptor (`<socket>,<length>`)
    pub fn push_message(&mut self, descriptor: String) {
        debug!("Message waiting: {}", descriptor);
        self.pending_messages.push_back(descriptor);
    }

    /// Put a descriptor back at the head of the queue
    ///
    /// Used for bytes a read left in the module's buffer; the module does not
    /// announce them again.
    pub fn requeue_message(&mut self, descriptor: String) {
        debug!("Message still waiting: {}", descriptor);
        self.pending_messages.push_front(descriptor);
    }

    /// Number of queued message descriptors
    pub fn pending_messages(&self) -> usize {
        self.pending_messages.len()
    }

    /// Take the oldest descriptor addressed to `socket`
    ///
    /// Descriptors whose socket field cannot be read match any socket.
    pub fn take_message_for(&mut self, socket: u8) -> Option<String> {
        let pos = self.pending_messages.iter().position(|d| {
            descriptor_socket(d).map_or(true, |id| id == socket)
        })?;
        self.pending_messages.remove(pos)
    }

    /// Forget everything learned from the module (after a reboot)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Socket id of a `<socket>,<length>` descriptor
pub fn descriptor_socket(descriptor: &str) -> Option<u8> {
    descriptor.split(',').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str, value: i64) -> RadioStatistic {
        RadioStatistic {
            group: "RADIO".into(),
            name: name.into(),
            value,
        }
    }

    #[test]
    fn test_apply_known_statistics() {
        let mut radio = RadioStatistics::default();
        assert!(radio.apply(&stat("Signal power", -682)));
        assert!(radio.apply(&stat("ECL", 1)));
        assert!(radio.apply(&stat("RSRQ", -108)));

        assert_eq!(radio.signal_power, Some(-682));
        assert_eq!(radio.ecl, Some(1));
        assert_eq!(radio.rsrq, Some(-108.0));
    }

    #[test]
    fn test_unknown_statistic_is_ignored() {
        let mut radio = RadioStatistics::default();
        assert!(!radio.apply(&stat("Beam", 3)));

        let other_group = RadioStatistic {
            group: "CELL".into(),
            name: "Signal power".into(),
            value: 1,
        };
        assert!(!radio.apply(&other_group));
        assert_eq!(radio, RadioStatistics::default());
    }

    #[test]
    fn test_apply_quality() {
        let mut radio = RadioStatistics::default();
        radio.apply_quality(&SignalQuality {
            kind: SignalQualityKind::Rsrp,
            pci: 162,
            earfcn: 6300,
            value: -112.0,
        });

        assert_eq!(radio.rsrp, Some(-112.0));
        assert_eq!(radio.pci, Some(162));
        assert_eq!(radio.earfcn, Some(6300));
    }

    #[test]
    fn test_messages_are_taken_per_socket_in_order() {
        let mut state = ModuleState::new();
        state.push_message("1,4".into());
        state.push_message("0,2".into());
        state.push_message("0,8".into());

        assert_eq!(state.take_message_for(0).as_deref(), Some("0,2"));
        assert_eq!(state.take_message_for(0).as_deref(), Some("0,8"));
        assert_eq!(state.take_message_for(0), None);
        assert_eq!(state.pending_messages(), 1);
    }

    #[test]
    fn test_requeued_message_is_taken_first() {
        let mut state = ModuleState::new();
        state.push_message("0,8".into());
        state.requeue_message("0,2".into());

        assert_eq!(state.take_message_for(0).as_deref(), Some("0,2"));
        assert_eq!(state.take_message_for(0).as_deref(), Some("0,8"));
    }

    #[test]
    fn test_reset() {
        let mut state = ModuleState::new();
        state.set_connected(true);
        state.set_registration(RegistrationStatus::Home);
        state.reset();

        assert!(!state.connected());
        assert_eq!(state.registration(), None);
    }
}
