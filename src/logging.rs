// Diagnostic logging setup.
//
// Library code logs through the `log` macros only. The binary reads the debug
// toggle once at startup and hands it to `init_logging`.

use std::io::Write;

use log::LevelFilter;

/// Environment variable that turns on diagnostic output
pub const DEBUG_ENV: &str = "KM_PLOT_DEBUG";
/// Prefix on every diagnostic line
pub const LOG_TAG: &str = "[KMPlot]";

/// Process-wide logging settings, fixed at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub debug: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(DEBUG_ENV).ok().as_deref())
    }

    /// `1`, `true` and `yes` enable debugging, in any case
    pub fn from_value(value: Option<&str>) -> Self {
        let debug = value
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { debug }
    }

    pub fn level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        }
    }
}

/// Install the stderr logger. Fails only if a logger is already installed.
pub fn init_logging(settings: LogSettings) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(settings.level())
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "{} {}", LOG_TAG, record.args()))
        .try_init()
}
