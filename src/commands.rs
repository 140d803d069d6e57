use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::config::PlotConfig;
use crate::device::{
    icon_candidates, Controller, DeviceError, PlotterKey, PlotterProfile, PlotterRegistry,
    Presentation, SelectedDevice, Status, NO_PORT_ICON,
};
use crate::hpgl::HpglFile;
use crate::serial::{Enumerator, PortScan, TransmitReport};

/// One line of the device list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRow {
    pub path: String,
    pub key: Option<PlotterKey>,
    pub name: String,
    pub info: String,
    pub supported: bool,
}

impl DeviceRow {
    pub fn display(&self) -> String {
        match &self.key {
            Some(key) => format!("{} ({})", self.path, key),
            None => self.path.clone(),
        }
    }
}

/// Rows for identified candidates, in enumeration order, then unidentified ports
pub fn device_rows(scan: &PortScan, registry: &PlotterRegistry) -> Vec<DeviceRow> {
    let identified = scan.candidates.iter().map(|candidate| {
        let key = candidate.key();
        let profile = registry.lookup(&key);
        DeviceRow {
            path: candidate.path.clone(),
            name: profile
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| "Unknown device".to_string()),
            info: candidate.info(),
            supported: profile.is_some(),
            key: Some(key),
        }
    });

    let unidentified = scan.unidentified.iter().map(|path| DeviceRow {
        path: path.clone(),
        key: None,
        name: "Unidentified port".to_string(),
        info: String::new(),
        supported: false,
    });

    identified.chain(unidentified).collect()
}

/// Prints status and device changes to stdout, once per change
#[derive(Default)]
pub struct ConsolePresentation {
    last_status: Mutex<Option<Status>>,
    last_devices: Mutex<Option<(PortScan, SelectedDevice)>>,
}

impl Presentation for ConsolePresentation {
    fn show_status(&self, status: &Status) {
        // The poll loop reports "searching" every cycle; only echo changes
        if *status == Status::Searching {
            return;
        }
        let mut last = self.last_status.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_ref() != Some(status) {
            if status.is_error() {
                eprintln!("{}", status);
            } else {
                println!("{}", status);
            }
            *last = Some(status.clone());
        }
    }

    fn show_devices(&self, scan: &PortScan, selected: &SelectedDevice, profile: Option<&PlotterProfile>) {
        let mut last = self.last_devices.lock().unwrap_or_else(|e| e.into_inner());
        let current = (scan.clone(), selected.clone());
        if last.as_ref() == Some(&current) {
            return;
        }
        *last = Some(current);

        if scan.candidates.is_empty() {
            println!("No Serial Devices Found");
        }
        let fallback = (!selected.is_present()).then_some(NO_PORT_ICON);
        log::debug!("Device icon candidates: {:?}", icon_candidates(profile, fallback));

        if let Some(path) = &selected.path {
            let name = profile.map(|p| p.display_name.as_str()).unwrap_or("Unknown device");
            println!("Active device: {} on {}", name, path);
        }
    }
}

/// Print every serial port the enumerator can see
pub fn list_devices(enumerator: &Enumerator, registry: &PlotterRegistry) {
    let scan = enumerator.scan();
    let rows = device_rows(&scan, registry);
    if rows.is_empty() {
        println!("No Serial Devices Found");
        return;
    }

    for row in rows {
        let marker = if row.supported { "*" } else { " " };
        println!("{} {:<40} {}", marker, row.display(), row.name);
        for line in row.info.lines() {
            println!("    {}", line);
        }
    }
}

/// Print the plotters the registry knows about
pub fn list_plotters(registry: &PlotterRegistry) {
    for profile in registry.profiles() {
        println!("{}  {}", profile.key, profile.display_name);
    }
}

pub fn show_config(config: &PlotConfig) -> anyhow::Result<()> {
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

/// Poll until Ctrl-C
pub async fn watch_devices<P: Presentation + 'static>(controller: Arc<Controller<P>>, interval: Duration) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = controller.clone();
    let polling = tokio::spawn(async move { poller.run_polling(interval, shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    polling.await?;
    Ok(())
}

/// Poll once, then send `file` to `port` or to the selected device
pub async fn send_file<P: Presentation>(
    controller: &Controller<P>,
    file: &Path,
    port: Option<&str>,
) -> Result<TransmitReport, DeviceError> {
    let renderer = HpglFile::new(file);
    match port {
        Some(port) => controller.send_to(port, &renderer).await,
        None => {
            controller.poll().await;
            controller.send(&renderer).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::DeviceCandidate;

    #[test]
    fn test_device_rows() {
        let mut supported = DeviceCandidate::new("COM3", 0x0483, 0x5740);
        supported.product = Some("Virtual COM Port".into());
        let scan = PortScan {
            candidates: vec![supported, DeviceCandidate::new("COM4", 0xdead, 0xbeef)],
            unidentified: vec!["COM1".into()],
        };

        let rows = device_rows(&scan, PlotterRegistry::builtin());
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].display(), "COM3 (0483:5740)");
        assert!(rows[0].supported);
        assert_eq!(rows[0].info, "Virtual COM Port");

        assert_eq!(rows[1].name, "Unknown device");
        assert!(!rows[1].supported);

        assert_eq!(rows[2].display(), "COM1");
        assert_eq!(rows[2].key, None);
    }

    #[test]
    fn test_console_only_records_changes() {
        let console = ConsolePresentation::default();
        console.show_status(&Status::Ready);
        console.show_status(&Status::Searching);
        assert_eq!(*console.last_status.lock().unwrap(), Some(Status::Ready));

        console.show_status(&Status::WaitingForPlotter);
        assert_eq!(*console.last_status.lock().unwrap(), Some(Status::WaitingForPlotter));
    }
}
