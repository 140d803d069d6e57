use std::sync::Arc;

use serialport::SerialPortType;

use super::{DeviceCandidate, PortScan, Result};

/// One port as reported by the operating system, before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRecord {
    pub path: String,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortRecord {
    pub fn usb(path: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            path: path.into(),
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
            ..Default::default()
        }
    }

    pub fn bare(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Source of the host's serial port inventory
pub trait PortSource: Send + Sync {
    /// List ports. `include_links` also reports symlinked/virtual ports.
    fn list_ports(&self, include_links: bool) -> Result<Vec<PortRecord>>;
}

/// Port inventory backed by the serialport crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortSource for SystemPorts {
    fn list_ports(&self, include_links: bool) -> Result<Vec<PortRecord>> {
        let listed = serialport::available_ports();

        let mut records: Vec<PortRecord> = match listed {
            Ok(ports) => ports
                .into_iter()
                .map(|port| match port.port_type {
                    SerialPortType::UsbPort(usb_info) => PortRecord {
                        path: port.port_name,
                        vendor_id: Some(usb_info.vid),
                        product_id: Some(usb_info.pid),
                        manufacturer: usb_info.manufacturer,
                        product: usb_info.product,
                    },
                    _ => PortRecord::bare(port.port_name),
                })
                .collect(),
            // The link scan can still find ports on its own
            Err(e) if include_links => {
                log::debug!("serialport::available_ports() failed: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        if include_links {
            for link in linked_ports() {
                if !records.iter().any(|r| r.path == link.path) {
                    records.push(link);
                }
            }
        }

        Ok(records)
    }
}

#[cfg(target_os = "linux")]
fn linked_ports() -> Vec<PortRecord> {
    linux::by_id_ports()
}

#[cfg(not(target_os = "linux"))]
fn linked_ports() -> Vec<PortRecord> {
    Vec::new()
}

#[cfg(target_os = "linux")]
mod linux {
    use std::ffi::OsStr;
    use std::fs;

    use libudev::{Context, Device};

    use super::PortRecord;

    const BY_ID_DIR: &str = "/dev/serial/by-id";

    /// Resolve /dev/serial/by-id links and identify them through udev
    pub(super) fn by_id_ports() -> Vec<PortRecord> {
        let entries = match fs::read_dir(BY_ID_DIR) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("No {} ({})", BY_ID_DIR, e);
                return Vec::new();
            }
        };

        let context = match Context::new() {
            Ok(context) => Some(context),
            Err(e) => {
                log::debug!("udev unavailable, links stay unidentified: {}", e);
                None
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let link = entry.path();
                let target = fs::canonicalize(&link).ok()?;
                let tty_name = target.file_name()?.to_str()?.to_string();
                let mut record = context
                    .as_ref()
                    .and_then(|context| usb_attributes(context, &tty_name))
                    .unwrap_or_default();
                record.path = link.to_str()?.to_string();
                Some(record)
            })
            .collect()
    }

    fn tty_device(context: &Context, tty_name: &str) -> Option<Device> {
        let mut enumerator = libudev::Enumerator::new(context).ok()?;
        enumerator.match_subsystem("tty").ok()?;
        enumerator.match_sysname(tty_name).ok()?;
        let device = enumerator.scan_devices().ok()?.next();
        device
    }

    /// The USB device (not interface) the tty hangs off
    fn usb_parent(device: &Device) -> Option<Device> {
        let mut current = device.parent();
        while let Some(parent) = current {
            if parent.subsystem() == Some(OsStr::new("usb"))
                && parent.devtype() == Some(OsStr::new("usb_device"))
            {
                return Some(parent);
            }
            current = parent.parent();
        }
        None
    }

    fn usb_attributes(context: &Context, tty_name: &str) -> Option<PortRecord> {
        let tty = tty_device(context, tty_name)?;
        let usb = usb_parent(&tty)?;

        Some(PortRecord {
            path: String::new(),
            vendor_id: attribute(&usb, "idVendor").as_deref().and_then(parse_id),
            product_id: attribute(&usb, "idProduct").as_deref().and_then(parse_id),
            manufacturer: attribute(&usb, "manufacturer"),
            product: attribute(&usb, "product"),
        })
    }

    fn attribute(device: &Device, name: &str) -> Option<String> {
        device
            .attribute_value(name)
            .and_then(|value| value.to_str())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse_id(text: &str) -> Option<u16> {
        u16::from_str_radix(text.trim(), 16).ok()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_id() {
            assert_eq!(parse_id("0483"), Some(0x0483));
            assert_eq!(parse_id("1a86\n"), Some(0x1a86));
            assert_eq!(parse_id(""), None);
            assert_eq!(parse_id("xyz"), None);
        }
    }
}

/// Lists serial-capable devices and keeps the ones that can be matched
#[derive(Clone)]
pub struct Enumerator {
    source: Arc<dyn PortSource>,
}

impl Enumerator {
    pub fn new(source: Arc<dyn PortSource>) -> Self {
        Self { source }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemPorts))
    }

    /// Identified candidates only
    pub fn enumerate(&self) -> Vec<DeviceCandidate> {
        self.scan().candidates
    }

    /// Query the port inventory. Never fails: a failed query is an empty scan.
    pub fn scan(&self) -> PortScan {
        let records = match self.source.list_ports(false) {
            Ok(records) => records,
            Err(e) => {
                log::debug!("Port enumeration failed: {}", e);
                return PortScan::default();
            }
        };

        let records = if records.is_empty() {
            log::debug!("Port enumeration reported no ports; retrying with links.");
            match self.source.list_ports(true) {
                Ok(records) => records,
                Err(e) => {
                    log::debug!("Port enumeration with links failed: {}", e);
                    return PortScan::default();
                }
            }
        } else {
            records
        };

        if records.is_empty() {
            log::debug!("Port enumeration still returned no ports.");
        }

        let mut scan = PortScan::default();
        for record in records {
            log::debug!(
                "Serial port candidate: device={}, vid={:?}, pid={:?}",
                record.path,
                record.vendor_id,
                record.product_id
            );
            if record.path.is_empty() {
                continue;
            }
            match (record.vendor_id, record.product_id) {
                (Some(vendor_id), Some(product_id)) => scan.candidates.push(DeviceCandidate {
                    path: record.path,
                    vendor_id,
                    product_id,
                    manufacturer: record.manufacturer,
                    product: record.product,
                }),
                _ => scan.unidentified.push(record.path),
            }
        }

        scan
    }
}

impl Default for Enumerator {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::SerialError;
    use std::sync::Mutex;

    /// Replays one scripted answer per call and records the flags it was asked with
    struct ScriptedSource {
        answers: Mutex<Vec<Result<Vec<PortRecord>>>>,
        calls: Mutex<Vec<bool>>,
    }

    impl ScriptedSource {
        fn new(answers: Vec<Result<Vec<PortRecord>>>) -> Self {
            Self {
                answers: Mutex::new(answers),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PortSource for ScriptedSource {
        fn list_ports(&self, include_links: bool) -> Result<Vec<PortRecord>> {
            self.calls.lock().unwrap().push(include_links);
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                Ok(Vec::new())
            } else {
                answers.remove(0)
            }
        }
    }

    #[test]
    fn test_query_failure_yields_empty() {
        let source = Arc::new(ScriptedSource::new(vec![Err(SerialError::Enumeration(
            "no backend".into(),
        ))]));
        let enumerator = Enumerator::new(source.clone());

        assert!(enumerator.enumerate().is_empty());
        assert_eq!(source.calls(), vec![false]);
    }

    #[test]
    fn test_retries_with_links_when_empty() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(Vec::new()),
            Ok(vec![PortRecord::usb("/dev/serial/by-id/usb-cutter", 0x0483, 0x5740)]),
        ]));
        let enumerator = Enumerator::new(source.clone());

        let candidates = enumerator.enumerate();
        assert_eq!(source.calls(), vec![false, true]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, "/dev/serial/by-id/usb-cutter");
    }

    #[test]
    fn test_retry_failure_yields_empty() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(Vec::new()),
            Err(SerialError::Enumeration("links unavailable".into())),
        ]));
        let enumerator = Enumerator::new(source.clone());

        assert_eq!(enumerator.scan(), PortScan::default());
        assert_eq!(source.calls(), vec![false, true]);
    }

    #[test]
    fn test_no_retry_when_ports_found() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![PortRecord::bare("/dev/ttyS0")])]));
        let enumerator = Enumerator::new(source.clone());

        let scan = enumerator.scan();
        assert_eq!(source.calls(), vec![false]);
        assert!(scan.candidates.is_empty());
        assert_eq!(scan.unidentified, vec!["/dev/ttyS0".to_string()]);
    }

    #[test]
    fn test_drops_unidentified_and_pathless_records() {
        let mut half = PortRecord::bare("/dev/ttyUSB1");
        half.vendor_id = Some(0x1a86);

        let mut full = PortRecord::usb("/dev/ttyACM0", 0x04d8, 0x000a);
        full.manufacturer = Some("Microchip".into());

        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
            PortRecord::usb("", 0x0483, 0x5740),
            half,
            full,
        ])]));
        let scan = Enumerator::new(source).scan();

        assert_eq!(scan.candidates.len(), 1);
        assert_eq!(scan.candidates[0].path, "/dev/ttyACM0");
        assert_eq!(scan.candidates[0].manufacturer.as_deref(), Some("Microchip"));
        assert_eq!(scan.unidentified, vec!["/dev/ttyUSB1".to_string()]);
    }

    #[test]
    fn test_preserves_source_order() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
            PortRecord::usb("COM7", 0x1a86, 0x7523),
            PortRecord::usb("COM3", 0x0483, 0x5740),
        ])]));
        let paths: Vec<String> = Enumerator::new(source)
            .enumerate()
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(paths, vec!["COM7", "COM3"]);
    }
}
