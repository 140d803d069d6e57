pub mod manager;
pub mod matcher;
pub mod models;
pub mod registry;

pub use manager::{Controller, PollOutcome, Presentation, Status};
pub use matcher::{select_device, select_path};
pub use models::*;
pub use registry::PlotterRegistry;


#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No plotter detected yet.")]
    NoDevice,

    #[error("A job is already being sent")]
    Busy,

    #[error("Port {0} is not among the detected devices")]
    UnknownPort(String),

    #[error("Invalid plotter key: {0}")]
    InvalidKey(String),

    #[error("Rendering failed: {0}")]
    Render(#[from] crate::hpgl::RenderError),

    #[error("Serial communication error: {0}")]
    Serial(#[from] crate::serial::SerialError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Errors from the user-triggered send action
pub type SendError = DeviceError;

pub type Result<T> = std::result::Result<T, DeviceError>;
