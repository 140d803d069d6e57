use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DeviceError;

/// Canonical `vvvv:pppp` identifier of a plotter model, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlotterKey(String);

impl PlotterKey {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self(format!("{:04x}:{:04x}", vendor_id, product_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PlotterKey {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeviceError::InvalidKey(s.to_string());
        let (vid, pid) = s.trim().split_once(':').ok_or_else(invalid)?;

        let parse = |part: &str| {
            if part.is_empty() || part.len() > 4 {
                return None;
            }
            u16::from_str_radix(part, 16).ok()
        };

        match (parse(vid), parse(pid)) {
            (Some(vid), Some(pid)) => Ok(Self::new(vid, pid)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for PlotterKey {
    type Error = DeviceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlotterKey> for String {
    fn from(key: PlotterKey) -> Self {
        key.0
    }
}

impl fmt::Display for PlotterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata for a supported plotter model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotterProfile {
    pub key: PlotterKey,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default, alias = "icon")]
    pub icon_ref: Option<String>,
}

impl PlotterProfile {
    pub fn new(key: PlotterKey, display_name: impl Into<String>, icon_ref: Option<&str>) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            icon_ref: icon_ref.map(str::to_string),
        }
    }
}

/// Icon used when nothing better resolves
pub const UNKNOWN_ICON: &str = "unknown";
/// Icon shown while no serial device is present
pub const NO_PORT_ICON: &str = "noport";

/// Icon names to try in order: the profile's own icon, the state fallback, then
/// [`UNKNOWN_ICON`]. The presentation shows its own missing-image indicator past the end.
pub fn icon_candidates<'a>(profile: Option<&'a PlotterProfile>, fallback: Option<&'a str>) -> Vec<&'a str> {
    let mut names = Vec::with_capacity(3);
    if let Some(icon) = profile.and_then(|p| p.icon_ref.as_deref()) {
        names.push(icon);
    }
    if let Some(fallback) = fallback {
        names.push(fallback);
    }
    names.push(UNKNOWN_ICON);
    names
}

/// The device the controller currently targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDevice {
    pub path: Option<String>,
    pub key: Option<PlotterKey>,
    pub supported: bool,
}

impl SelectedDevice {
    /// No device present
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.path.is_some()
    }
}
