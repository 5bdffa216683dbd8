//! Serial port access
//!
//! Opening a module's port with the settings its generation expects, and
//! enumerating candidate ports.

use std::time::Duration;

use sara_protocol::ModuleVariant;
use serialport::SerialPortType;
use tokio_serial::{FlowControl, SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::config::ModemConfig;
use crate::error::ModemError;
use crate::modem::Modem;
use crate::variant::VariantProfile;

impl Modem<SerialStream> {
    /// Open `path` with the variant's baud rate and flow control
    pub fn open(
        path: &str,
        variant: ModuleVariant,
        config: ModemConfig,
    ) -> Result<Self, ModemError> {
        let profile = VariantProfile::for_variant(variant);
        let flow_control = if profile.hardware_flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        };

        let stream = tokio_serial::new(path, profile.baud_rate)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;

        info!("Opened {} at {} baud for {}", path, profile.baud_rate, variant);
        Ok(Modem::new(stream, variant, config))
    }
}

/// A serial port that may have a module attached
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            },
        }
    }

    /// Short description for listings
    pub fn describe(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!(
                "{} [{:04x}:{:04x}] {}",
                self.port,
                vid,
                pid,
                self.product.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            _ => self.port.clone(),
        }
    }
}

/// Enumerate serial ports, skipping Bluetooth and debug ports
pub fn available_ports() -> Result<Vec<SerialPortInfo>, ModemError> {
    let ports = serialport::available_ports()?;

    Ok(ports
        .into_iter()
        .filter(|p| !p.port_name.contains("Bluetooth") && !p.port_name.contains("debug"))
        .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_usb_port() {
        let info = SerialPortInfo {
            port: "/dev/ttyUSB0".into(),
            vid: Some(0x1546),
            pid: Some(0x01a8),
            manufacturer: Some("u-blox".into()),
            product: Some("SARA-R4".into()),
        };
        assert_eq!(info.describe(), "/dev/ttyUSB0 [1546:01a8] SARA-R4");
    }

    #[test]
    fn test_describe_plain_port() {
        let info = SerialPortInfo::from_serialport("/dev/ttyS0".into(), &SerialPortType::Unknown);
        assert_eq!(info.describe(), "/dev/ttyS0");
    }

    #[test]
    fn test_enumeration_error_is_serial_error() {
        fn enumerate() -> Result<(), ModemError> {
            Err(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "udev unavailable",
            ))?
        }

        assert!(matches!(enumerate(), Err(ModemError::Serial(_))));
    }
}
