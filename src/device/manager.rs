use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;

use crate::hpgl::{self, HpglRenderer};
use crate::serial::{Enumerator, PortScan, SerialConfig, SerialSession, TransmitReport};
use super::{select_device, select_path, DeviceError, PlotterProfile, PlotterRegistry, Result, SelectedDevice};

/// Interval between device polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status line shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Searching,
    WaitingForPlotter,
    Ready,
    Sending,
    Sent(String),
    NoPlotter,
    Failed(String),
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::NoPlotter | Status::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            f.write_str("Error: ")?;
        }
        match self {
            Status::Searching => f.write_str("Searching for devices..."),
            Status::WaitingForPlotter => f.write_str("Waiting for a supported plotter..."),
            Status::Ready => f.write_str("Ready"),
            Status::Sending => f.write_str("Sending to plotter..."),
            Status::Sent(path) => write!(f, "Sent the document to {}.", path),
            Status::NoPlotter => f.write_str("No plotter detected."),
            Status::Failed(reason) => write!(f, "Cut failed: {}", reason),
        }
    }
}

/// Whatever shows device state to the user (window, console, ...)
pub trait Presentation: Send + Sync {
    fn show_status(&self, status: &Status);

    fn show_devices(&self, scan: &PortScan, selected: &SelectedDevice, profile: Option<&PlotterProfile>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A send was in flight; nothing was enumerated
    Skipped,
    Updated(SelectedDevice),
}

/// Holds the `sending` flag until dropped
struct SendingGuard(Arc<AtomicBool>);

impl SendingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Central plotter link controller.
/// Owns the selected device and the sending flag; everything else only reads them.
pub struct Controller<P: Presentation> {
    enumerator: Enumerator,
    session: SerialSession,
    registry: Arc<PlotterRegistry>,
    serial_config: SerialConfig,
    presentation: Arc<P>,
    selected: Arc<RwLock<SelectedDevice>>,
    last_scan: Arc<RwLock<PortScan>>,
    sending: Arc<AtomicBool>,
    // Held by an enumeration or a transmission, never both at once
    transport: Arc<Mutex<()>>,
}

impl<P: Presentation> Controller<P> {
    pub fn new(presentation: P, serial_config: SerialConfig) -> Self {
        Self {
            enumerator: Enumerator::system(),
            session: SerialSession::system(),
            registry: Arc::new(PlotterRegistry::builtin().clone()),
            serial_config,
            presentation: Arc::new(presentation),
            selected: Arc::new(RwLock::new(SelectedDevice::none())),
            last_scan: Arc::new(RwLock::new(PortScan::default())),
            sending: Arc::new(AtomicBool::new(false)),
            transport: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_enumerator(mut self, enumerator: Enumerator) -> Self {
        self.enumerator = enumerator;
        self
    }

    pub fn with_session(mut self, session: SerialSession) -> Self {
        self.session = session;
        self
    }

    pub fn with_registry(mut self, registry: PlotterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn registry(&self) -> &PlotterRegistry {
        &self.registry
    }

    pub fn serial_config(&self) -> &SerialConfig {
        &self.serial_config
    }

    pub async fn selected(&self) -> SelectedDevice {
        self.selected.read().await.clone()
    }

    pub async fn last_scan(&self) -> PortScan {
        self.last_scan.read().await.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Enumerate, match and publish the result. Skipped while a job is being sent.
    pub async fn poll(&self) -> PollOutcome {
        if self.is_sending() {
            log::debug!("Send in progress; skipping device poll.");
            return PollOutcome::Skipped;
        }
        let transport = match self.transport.clone().try_lock_owned() {
            Ok(transport) => transport,
            Err(_) => {
                log::debug!("Port busy; skipping device poll.");
                return PollOutcome::Skipped;
            }
        };

        log::debug!("Polling for devices...");
        self.presentation.show_status(&Status::Searching);

        let enumerator = self.enumerator.clone();
        let scan = match tokio::task::spawn_blocking(move || {
            let _transport = transport;
            enumerator.scan()
        })
        .await
        {
            Ok(scan) => scan,
            Err(e) => {
                log::debug!("Enumeration task failed: {}", e);
                PortScan::default()
            }
        };

        let selected = {
            let mut selected_guard = self.selected.write().await;
            let next = select_device(&scan.candidates, &selected_guard, &self.registry);
            *selected_guard = next.clone();
            next
        };

        self.publish(&scan, &selected);
        *self.last_scan.write().await = scan;

        PollOutcome::Updated(selected)
    }

    /// Poll every `interval` until `shutdown` turns true or its sender goes away
    pub async fn run_polling(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        log::debug!("Using poll interval: {:?}", interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::debug!("Device polling stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Switch to another enumerated port, as picked by the user
    pub async fn select_port(&self, path: &str) -> Result<SelectedDevice> {
        let scan = self.last_scan.read().await.clone();
        let selected = select_path(&scan.candidates, path, &self.registry)
            .ok_or_else(|| DeviceError::UnknownPort(path.to_string()))?;

        *self.selected.write().await = selected.clone();
        self.publish(&scan, &selected);
        Ok(selected)
    }

    /// Render the document and send it to the selected device
    pub async fn send(&self, renderer: &dyn HpglRenderer) -> Result<TransmitReport> {
        let path = self.selected.read().await.path.clone();
        match path {
            Some(path) => self.send_to(&path, renderer).await,
            None => {
                self.presentation.show_status(&Status::NoPlotter);
                Err(DeviceError::NoDevice)
            }
        }
    }

    /// Render the document and send it to `path`, identified or not
    pub async fn send_to(&self, path: &str, renderer: &dyn HpglRenderer) -> Result<TransmitReport> {
        let guard = SendingGuard::acquire(&self.sending).ok_or(DeviceError::Busy)?;
        self.presentation.show_status(&Status::Sending);
        log::debug!("Generating HPGL and sending to {}", path);

        let result = self.transmit_rendered(guard, path, renderer).await;
        match &result {
            Ok(report) => {
                log::debug!("Sent {} bytes to {}", report.bytes_written, path);
                self.presentation.show_status(&Status::Sent(path.to_string()));
            }
            Err(e) => {
                log::debug!("Cut failed: {}", e);
                self.presentation.show_status(&Status::Failed(e.to_string()));
            }
        }
        result
    }

    async fn transmit_rendered(
        &self,
        guard: SendingGuard,
        path: &str,
        renderer: &dyn HpglRenderer,
    ) -> Result<TransmitReport> {
        let document = renderer.render()?;
        let payload = hpgl::frame(&document);

        let session = self.session.clone();
        let config = self.serial_config.clone();
        let path = path.to_string();

        // Waits out an enumeration that is already running
        let transport = self.transport.clone().lock_owned().await;

        // The guards travel with the blocking call so they outlive a dropped caller
        let report = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let _transport = transport;
            session.transmit(&path, &config, &payload)
        })
        .await
        .map_err(|e| DeviceError::Task(e.to_string()))??;

        Ok(report)
    }

    fn publish(&self, scan: &PortScan, selected: &SelectedDevice) {
        let profile = selected.key.as_ref().and_then(|key| self.registry.lookup(key));
        self.presentation.show_devices(scan, selected, profile);

        if selected.is_present() {
            if !self.is_sending() {
                self.presentation.show_status(&Status::Ready);
            }
        } else {
            log::debug!("No ports detected this cycle.");
            self.presentation.show_status(&Status::WaitingForPlotter);
        }
    }
}
