use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use super::{ConfigError, Result};
use crate::serial::{ByteSize, FlowControl, Parity, SerialConfig, StopBits};

// Ranges of the extension's option widgets
const BAUD_RANGE: RangeInclusive<u32> = 1200..=115200;
const RESOLUTION_RANGE: RangeInclusive<f64> = 10.0..=5000.0;
const PEN_RANGE: RangeInclusive<u8> = 0..=10;
const FORCE_SPEED_RANGE: RangeInclusive<u32> = 0..=1000;
const OVERCUT_RANGE: RangeInclusive<f64> = 0.0..=10.0;
const FLAT_RANGE: RangeInclusive<f64> = 0.1..=10.0;
const TOOL_OFFSET_RANGE: RangeInclusive<f64> = 0.0..=10.0;

/// Plot rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Orientation::Deg0),
            "90" => Ok(Orientation::Deg90),
            "180" => Ok(Orientation::Deg180),
            "270" => Ok(Orientation::Deg270),
            other => Err(format!("orientation must be 0, 90, 180 or 270, got '{}'", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

impl TryFrom<String> for Orientation {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Orientation> for String {
    fn from(value: Orientation) -> Self {
        value.to_string()
    }
}

/// The extension hands every option over as a string, hand-written files use numbers
fn number_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a whole number, got '{}'", text))),
    }
}

/// Connection and plot parameters, one flat key per extension option.
///
/// Missing keys fall back to the extension defaults. Only the serial subset is
/// used by the transport; the rest is carried for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlotConfig {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub serial_baud_rate: u32,
    pub serial_byte_size: ByteSize,
    pub serial_stop_bits: StopBits,
    pub serial_parity: Parity,
    pub serial_flow_control: FlowControl,
    /// Dots per inch along X
    pub resolution_x: f64,
    pub resolution_y: f64,
    pub pen: u8,
    pub force: u32,
    pub speed: u32,
    pub orientation: Orientation,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Put the zero point at the document center
    pub center: bool,
    /// mm
    pub overcut: f64,
    pub precut: bool,
    /// Curve flattening tolerance
    pub flat: f64,
    pub auto_align: bool,
    /// mm
    pub tool_offset: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        let serial = SerialConfig::default();
        Self {
            serial_baud_rate: serial.baud_rate,
            serial_byte_size: serial.byte_size,
            serial_stop_bits: serial.stop_bits,
            serial_parity: serial.parity,
            serial_flow_control: serial.flow_control,
            resolution_x: 1016.0,
            resolution_y: 1016.0,
            pen: 1,
            force: 0,
            speed: 0,
            orientation: Orientation::Deg0,
            mirror_x: false,
            mirror_y: false,
            center: false,
            overcut: 1.0,
            precut: true,
            flat: 1.2,
            auto_align: true,
            tool_offset: 0.25,
        }
    }
}

impl PlotConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded plot configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlotConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        check("serialBaudRate", &self.serial_baud_rate, &BAUD_RANGE)?;
        check("resolutionX", &self.resolution_x, &RESOLUTION_RANGE)?;
        check("resolutionY", &self.resolution_y, &RESOLUTION_RANGE)?;
        check("pen", &self.pen, &PEN_RANGE)?;
        check("force", &self.force, &FORCE_SPEED_RANGE)?;
        check("speed", &self.speed, &FORCE_SPEED_RANGE)?;
        check("overcut", &self.overcut, &OVERCUT_RANGE)?;
        check("flat", &self.flat, &FLAT_RANGE)?;
        check("toolOffset", &self.tool_offset, &TOOL_OFFSET_RANGE)?;
        Ok(())
    }

    /// The part of the configuration the serial transport consumes
    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.serial_baud_rate,
            byte_size: self.serial_byte_size,
            stop_bits: self.serial_stop_bits,
            parity: self.serial_parity,
            flow_control: self.serial_flow_control,
        }
    }
}

fn check<T>(key: &str, value: &T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    if range.contains(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("{} is outside {}..={}", value, range.start(), range.end()),
        })
    }
}
