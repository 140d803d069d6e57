use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use super::settings::{
    to_serialport_data_bits, to_serialport_flow_control, to_serialport_parity,
    to_serialport_stop_bits, FlowControl, SerialConfig,
};
use super::{Result, SerialError};

/// How long to wait for the plotter to acknowledge a job
pub const ACK_TIMEOUT: Duration = Duration::from_secs(1);
/// Acknowledgment bytes read after a job is written
pub const ACK_LEN: usize = 2;

/// An open connection to a plotter. Dropping it closes the port.
pub trait PlotterPort: Read + Write + Send {
    /// Bound how long the next read may block. Ports that never block ignore it.
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl PlotterPort for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// Opens serial endpoints. Implementations report open failures as `SerialError::Open`.
pub trait PortOpener: Send + Sync {
    fn open(&self, path: &str, config: &SerialConfig, timeout: Duration) -> Result<Box<dyn PlotterPort>>;
}

/// Opens real ports through the serialport crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl PortOpener for SystemOpener {
    fn open(&self, path: &str, config: &SerialConfig, timeout: Duration) -> Result<Box<dyn PlotterPort>> {
        let stop_bits = to_serialport_stop_bits(config.stop_bits)?;
        let parity = to_serialport_parity(config.parity)?;

        let mut port = serialport::new(path, config.baud_rate)
            .data_bits(to_serialport_data_bits(config.byte_size))
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(to_serialport_flow_control(config.flow_control))
            .timeout(timeout)
            .open()
            .map_err(|e| SerialError::Open {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if config.flow_control == FlowControl::DsrDtrRtsCts {
            if let Err(e) = port.write_data_terminal_ready(true) {
                log::debug!("Could not assert DTR on {}: {}", path, e);
            }
        }

        Ok(Box::new(port))
    }
}

/// Outcome of a completed transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitReport {
    pub bytes_written: usize,
    /// Bytes the plotter sent back, if any arrived before the timeout
    pub acknowledgment: Option<Vec<u8>>,
}

/// Sends one payload per call over a freshly opened port
#[derive(Clone)]
pub struct SerialSession {
    opener: Arc<dyn PortOpener>,
}

impl SerialSession {
    pub fn new(opener: Arc<dyn PortOpener>) -> Self {
        Self { opener }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemOpener))
    }

    /// Open `path`, write the whole payload and wait briefly for an acknowledgment.
    ///
    /// A missing acknowledgment is not an error. The port is closed before this returns,
    /// whatever the outcome. Failures are returned as-is; nothing is retried.
    pub fn transmit(&self, path: &str, config: &SerialConfig, payload: &[u8]) -> Result<TransmitReport> {
        if config.baud_rate == 0 {
            return Err(SerialError::InvalidConfiguration(
                "baud rate must be positive".to_string(),
            ));
        }

        log::debug!("Opening serial port {} {}", path, config);
        let mut port = self.opener.open(path, config, ACK_TIMEOUT)?;

        port.write_all(payload)?;
        port.flush()?;
        log::debug!("Wrote {} bytes to {}", payload.len(), path);

        let acknowledgment = read_acknowledgment(port.as_mut());
        match &acknowledgment {
            Some(bytes) => log::debug!("Plotter acknowledged with {:?}", bytes),
            None => log::debug!("No acknowledgment from {}", path),
        }

        Ok(TransmitReport {
            bytes_written: payload.len(),
            acknowledgment,
        })
    }
}

impl Default for SerialSession {
    fn default() -> Self {
        Self::system()
    }
}

/// Best-effort read of up to `ACK_LEN` bytes within `ACK_TIMEOUT` overall.
/// Read failures mean "no acknowledgment".
fn read_acknowledgment(port: &mut dyn PlotterPort) -> Option<Vec<u8>> {
    let deadline = Instant::now() + ACK_TIMEOUT;
    let mut buffer = [0u8; ACK_LEN];
    let mut filled = 0;

    while filled < ACK_LEN {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        // Each read only gets what is left of the overall wait
        if let Err(e) = port.set_read_timeout(remaining) {
            log::debug!("Could not bound the acknowledgment read: {}", e);
            break;
        }

        match port.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(ref e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
            Err(e) => {
                log::debug!("Acknowledgment read failed: {}", e);
                break;
            }
        }
    }

    (filled > 0).then(|| buffer[..filled].to_vec())
}
