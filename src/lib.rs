pub mod serial;
pub mod device;
pub mod commands;
pub mod config;
pub mod hpgl;
pub mod logging;

pub use config::PlotConfig;
pub use device::{Controller, PlotterKey, PlotterProfile, PlotterRegistry, Presentation, SelectedDevice};
pub use hpgl::{frame, HpglDocument, HpglRenderer};
pub use serial::{DeviceCandidate, Enumerator, SerialConfig, SerialSession};
