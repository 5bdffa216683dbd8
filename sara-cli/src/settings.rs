//! Tool settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use sara_modem::{ModemConfig, SetupOptions};
use sara_protocol::ModuleVariant;
use serde::{Deserialize, Serialize};

/// Settings read from a JSON file; every field is optional in the file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial port path
    pub port: String,
    /// Attached module generation
    pub variant: ModuleVariant,
    /// Numeric PLMN of the operator to select
    pub operator: String,
    /// Complete the attach on roaming registration instead of home
    pub roaming: bool,
    /// RAT, APN and bands applied during setup
    pub setup: SetupOptions,
    /// Engine timings
    pub modem: ModemConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            variant: ModuleVariant::SaraN211,
            operator: "24001".to_string(),
            roaming: false,
            setup: SetupOptions::default(),
            modem: ModemConfig::default(),
        }
    }
}

impl Settings {
    fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config").join("sara"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or from the default location if it exists
    ///
    /// An explicitly named file must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::settings_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use sara_protocol::RadioAccessTechnology;

    use super::*;

    #[test]
    fn test_partial_settings() {
        let settings = Settings::from_json(
            r#"{
                "port": "/dev/ttyACM0",
                "variant": "SaraR4",
                "setup": { "rat": "LteM", "apn": "telenor.iot", "bands": [3, 20] },
                "modem": { "connect_timeout_secs": 60 }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.port, "/dev/ttyACM0");
        assert_eq!(settings.variant, ModuleVariant::SaraR4);
        assert_eq!(settings.setup.rat, Some(RadioAccessTechnology::LteM));
        assert_eq!(settings.setup.bands, vec![3, 20]);
        assert_eq!(settings.modem.connect_timeout_secs, 60);
        assert_eq!(settings.modem.command_timeout_ms, 10_000);
        assert_eq!(settings.operator, "24001");
    }

    #[test]
    fn test_empty_settings_are_default() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }
}
