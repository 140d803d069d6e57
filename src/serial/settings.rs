// Serial line settings for plotter connections.
// Provides the configuration enums and their mapping onto the serialport crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl as SpFlowControl, Parity as SpParity, StopBits as SpStopBits};

use super::{Result, SerialError};

// ============================================================================
// Types
// ============================================================================

/// Data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ByteSize {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    Mark,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FlowControl {
    None,
    #[default]
    XonXoff,
    RtsCts,
    DsrDtrRtsCts,
}

/// Line settings for one serial connection.
///
/// Any combination can be constructed; it is checked when a port is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub byte_size: ByteSize,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            byte_size: ByteSize::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::XonXoff,
        }
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "baud={} size={} stop={} parity={} flow={}",
            self.baud_rate, self.byte_size, self.stop_bits, self.parity, self.flow_control
        )
    }
}

// ============================================================================
// String forms
// ============================================================================

// Both spellings come from the extension's option combos ("eight" and "8").

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5" | "five" => Ok(ByteSize::Five),
            "6" | "six" => Ok(ByteSize::Six),
            "7" | "seven" => Ok(ByteSize::Seven),
            "8" | "eight" => Ok(ByteSize::Eight),
            other => Err(format!("unknown byte size '{}'", other)),
        }
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ByteSize::Five => "five",
            ByteSize::Six => "six",
            ByteSize::Seven => "seven",
            ByteSize::Eight => "eight",
        })
    }
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "one" => Ok(StopBits::One),
            "1.5" | "onepointfive" => Ok(StopBits::OnePointFive),
            "2" | "two" => Ok(StopBits::Two),
            other => Err(format!("unknown stop bits '{}'", other)),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopBits::One => "one",
            StopBits::OnePointFive => "onepointfive",
            StopBits::Two => "two",
        })
    }
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => Err(format!("unknown parity '{}'", other)),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        })
    }
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(FlowControl::None),
            "xonxoff" => Ok(FlowControl::XonXoff),
            "rtscts" => Ok(FlowControl::RtsCts),
            "dsrdtrrtscts" => Ok(FlowControl::DsrDtrRtsCts),
            other => Err(format!("unknown flow control '{}'", other)),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowControl::None => "none",
            FlowControl::XonXoff => "xonxoff",
            FlowControl::RtsCts => "rtscts",
            FlowControl::DsrDtrRtsCts => "dsrdtrrtscts",
        })
    }
}

macro_rules! string_serde {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.to_string()
                }
            }
        )*
    };
}

string_serde!(ByteSize, StopBits, Parity, FlowControl);

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our ByteSize to serialport crate's DataBits type
pub fn to_serialport_data_bits(size: ByteSize) -> DataBits {
    match size {
        ByteSize::Five => DataBits::Five,
        ByteSize::Six => DataBits::Six,
        ByteSize::Seven => DataBits::Seven,
        ByteSize::Eight => DataBits::Eight,
    }
}

/// Convert our StopBits to serialport crate's StopBits type.
/// serialport has no 1.5 stop bit setting.
pub fn to_serialport_stop_bits(bits: StopBits) -> Result<SpStopBits> {
    match bits {
        StopBits::One => Ok(SpStopBits::One),
        StopBits::Two => Ok(SpStopBits::Two),
        StopBits::OnePointFive => Err(SerialError::UnsupportedConfiguration(
            "1.5 stop bits".to_string(),
        )),
    }
}

/// Convert our Parity to serialport crate's Parity type.
/// Mark and space parity are not available through serialport.
pub fn to_serialport_parity(parity: Parity) -> Result<SpParity> {
    match parity {
        Parity::None => Ok(SpParity::None),
        Parity::Odd => Ok(SpParity::Odd),
        Parity::Even => Ok(SpParity::Even),
        Parity::Mark | Parity::Space => Err(SerialError::UnsupportedConfiguration(format!(
            "{} parity",
            parity
        ))),
    }
}

/// Convert our FlowControl to serialport crate's FlowControl type.
/// DSR/DTR+RTS/CTS runs as hardware flow control; the opener asserts DTR separately.
pub fn to_serialport_flow_control(flow: FlowControl) -> SpFlowControl {
    match flow {
        FlowControl::None => SpFlowControl::None,
        FlowControl::XonXoff => SpFlowControl::Software,
        FlowControl::RtsCts | FlowControl::DsrDtrRtsCts => SpFlowControl::Hardware,
    }
}

// ============================================================================
// Tests
// ============================================================================
