//! Notification dispatch
//!
//! Applies URCs to [`ModuleState`] in arrival order. A verbose module error
//! is the only notification that fails the command in flight.

use sara_protocol::Urc;
use tracing::{debug, warn};

use crate::error::ModemError;
use crate::state::ModuleState;

/// Parse and apply a `+`-prefixed line
///
/// A malformed payload for a known token is logged and dropped.
pub fn dispatch_line(state: &mut ModuleState, line: &str) -> Result<(), ModemError> {
    match Urc::parse(line) {
        Ok(urc) => apply_urc(state, urc),
        Err(e) => {
            warn!("Ignoring malformed URC: {}", e);
            Ok(())
        }
    }
}

/// Apply a parsed URC
pub fn apply_urc(state: &mut ModuleState, urc: Urc) -> Result<(), ModemError> {
    debug!("Processing URC {}", urc.token());

    match urc {
        Urc::SignalingConnection { connected } => state.set_connected(connected),
        Urc::Registration { status } => state.set_registration(status),
        Urc::IpAddress(address) => state.set_ip_address(address),
        Urc::MessageIndicator(descriptor) => state.push_message(descriptor),
        Urc::PowerSaving { active } => state.set_power_saving(active),
        Urc::CmeError(text) => return Err(ModemError::Module(text)),
        Urc::Unrecognized { raw, .. } => debug!("Unhandled URC: {}", raw),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use sara_protocol::RegistrationStatus;

    use super::*;

    #[test]
    fn test_signaling_connection_toggles() {
        let mut state = ModuleState::new();

        dispatch_line(&mut state, "+CSCON: 1").unwrap();
        assert!(state.connected());

        dispatch_line(&mut state, "+CSCON: 0").unwrap();
        assert!(!state.connected());
    }

    #[test]
    fn test_registration_status() {
        let mut state = ModuleState::new();
        dispatch_line(&mut state, "+CEREG: 5").unwrap();
        assert_eq!(state.registration(), Some(RegistrationStatus::Roaming));
    }

    #[test]
    fn test_ip_address() {
        let mut state = ModuleState::new();
        dispatch_line(&mut state, "+CGPADDR: 0,\"10.160.14.7\"").unwrap();
        assert_eq!(state.ip_address(), Some("10.160.14.7"));
    }

    #[test]
    fn test_message_indicators_queue_in_order() {
        let mut state = ModuleState::new();
        dispatch_line(&mut state, "+NSONMI: 0,4").unwrap();
        dispatch_line(&mut state, "+NSONMI: 0,9").unwrap();

        assert_eq!(state.pending_messages(), 2);
        assert_eq!(state.take_message_for(0).as_deref(), Some("0,4"));
    }

    #[test]
    fn test_cme_error_fails() {
        let mut state = ModuleState::new();
        let err = dispatch_line(&mut state, "+CME ERROR: SIM not inserted").unwrap_err();
        match err {
            ModemError::Module(text) => assert_eq!(text, "+CME ERROR: SIM not inserted"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_and_malformed_are_ignored() {
        let mut state = ModuleState::new();
        dispatch_line(&mut state, "+UUSOCL: 0").unwrap();
        dispatch_line(&mut state, "+CSCON: maybe").unwrap();
        assert!(!state.connected());
    }
}
