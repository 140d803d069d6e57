pub mod interface;
pub mod session;
pub mod settings;

pub use interface::{Enumerator, PortRecord, PortSource, SystemPorts};
pub use session::{PlotterPort, PortOpener, SerialSession, SystemOpener, TransmitReport};
pub use settings::{ByteSize, FlowControl, Parity, SerialConfig, StopBits};

use serde::{Deserialize, Serialize};

use crate::device::PlotterKey;

/// A serial device discovered during one enumeration pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCandidate {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl DeviceCandidate {
    pub fn new(path: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            path: path.into(),
            vendor_id,
            product_id,
            manufacturer: None,
            product: None,
        }
    }

    pub fn key(&self) -> PlotterKey {
        PlotterKey::new(self.vendor_id, self.product_id)
    }

    /// Manufacturer and product strings, one per line
    pub fn info(&self) -> String {
        [self.manufacturer.as_deref(), self.product.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything one enumeration pass saw, split by whether the port could be identified
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScan {
    pub candidates: Vec<DeviceCandidate>,
    /// Ports with a usable path but no VID/PID
    pub unidentified: Vec<String>,
}

impl PortScan {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.unidentified.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Invalid serial configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported serial configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for SerialError {
    fn from(error: serialport::Error) -> Self {
        SerialError::Enumeration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_key() {
        let candidate = DeviceCandidate::new("/dev/ttyACM0", 0x04D8, 0x000A);
        assert_eq!(candidate.key().as_str(), "04d8:000a");
    }

    #[test]
    fn test_candidate_info_skips_missing_lines() {
        let mut candidate = DeviceCandidate::new("COM3", 0x0483, 0x5740);
        assert_eq!(candidate.info(), "");

        candidate.product = Some("Virtual COM Port".to_string());
        assert_eq!(candidate.info(), "Virtual COM Port");

        candidate.manufacturer = Some("STMicroelectronics".to_string());
        assert_eq!(candidate.info(), "STMicroelectronics\nVirtual COM Port");
    }
}
