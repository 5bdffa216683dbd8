//! Engine timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and transport overrides for a [`Modem`](crate::Modem)
///
/// Every field has a default, so a partial JSON object deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Deadline for an ordinary command exchange
    pub command_timeout_ms: u64,
    /// Deadline for a reboot command exchange
    pub reboot_timeout_ms: u64,
    /// Overall budget for network registration
    pub connect_timeout_secs: u64,
    /// Delay between registration status polls
    pub registration_poll_ms: u64,
    /// Delay between polled socket reads
    pub receive_poll_ms: u64,
    /// Soft timeout for a polled receive (returns no data when it elapses)
    pub receive_timeout_ms: u64,
    /// Hard timeout waiting for an incoming message indicator
    pub indicator_timeout_ms: u64,
    /// Override whether the module echoes commands
    pub echo: Option<bool>,
    /// Override the time to wait after a reboot
    pub reboot_settle_ms: Option<u64>,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 10_000,
            reboot_timeout_ms: 30_000,
            connect_timeout_secs: 180,
            registration_poll_ms: 2_000,
            receive_poll_ms: 2_000,
            receive_timeout_ms: 5_000,
            indicator_timeout_ms: 300_000,
            echo: None,
            reboot_settle_ms: None,
        }
    }
}

impl ModemConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn reboot_timeout(&self) -> Duration {
        Duration::from_millis(self.reboot_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn registration_poll_interval(&self) -> Duration {
        Duration::from_millis(self.registration_poll_ms)
    }

    pub fn receive_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receive_poll_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn indicator_timeout(&self) -> Duration {
        Duration::from_millis(self.indicator_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ModemConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(180));
        assert_eq!(config.registration_poll_interval(), Duration::from_secs(2));
        assert!(config.echo.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ModemConfig =
            serde_json::from_str(r#"{ "command_timeout_ms": 500, "echo": false }"#).unwrap();
        assert_eq!(config.command_timeout(), Duration::from_millis(500));
        assert_eq!(config.echo, Some(false));
        assert_eq!(config.connect_timeout_secs, 180);
    }
}
