use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

use super::{PlotterKey, PlotterProfile};
use crate::config::ConfigError;

/// Plotters known to work with the extension: (vendor, product, name, icon)
const BUILTIN_PLOTTERS: &[(u16, u16, &str, Option<&str>)] = &[
    (0x0483, 0x5740, "Vinyl cutter (STM32 virtual COM)", Some("stm32_cutter")),
    (0x04d8, 0x000a, "Vinyl cutter (Microchip CDC)", Some("microchip_cutter")),
    (0x1a86, 0x7523, "Vinyl cutter (CH340 USB-serial)", Some("ch340_cutter")),
    (0x067b, 0x2303, "Vinyl cutter (PL2303 USB-serial)", None),
];

static BUILTIN: Lazy<PlotterRegistry> = Lazy::new(|| {
    PlotterRegistry::from_profiles(BUILTIN_PLOTTERS.iter().map(|&(vid, pid, name, icon)| {
        PlotterProfile::new(PlotterKey::new(vid, pid), name, icon)
    }))
});

/// Immutable table of supported plotters, looked up by exact key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotterRegistry {
    profiles: HashMap<PlotterKey, PlotterProfile>,
}

impl PlotterRegistry {
    /// Later profiles replace earlier ones with the same key
    pub fn from_profiles(profiles: impl IntoIterator<Item = PlotterProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.key.clone(), p)).collect(),
        }
    }

    /// The table compiled into the extension, built on first use
    pub fn builtin() -> &'static PlotterRegistry {
        &BUILTIN
    }

    /// Parse a JSON array of profiles. Duplicate keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let profiles: Vec<PlotterProfile> = serde_json::from_str(json)?;
        let mut registry = Self::default();
        for profile in profiles {
            if registry.profiles.contains_key(&profile.key) {
                return Err(ConfigError::Invalid {
                    key: "registry".to_string(),
                    reason: format!("duplicate plotter key {}", profile.key),
                });
            }
            registry.profiles.insert(profile.key.clone(), profile);
        }
        Ok(registry)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let registry = Self::from_json_str(&json)?;
        log::debug!("Loaded {} plotter profiles from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn lookup(&self, key: &PlotterKey) -> Option<&PlotterProfile> {
        self.profiles.get(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles sorted by key
    pub fn profiles(&self) -> Vec<&PlotterProfile> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.key.cmp(&b.key));
        profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = PlotterRegistry::builtin();
        let profile = registry.lookup(&PlotterKey::new(0x0483, 0x5740)).unwrap();
        assert_eq!(profile.key.as_str(), "0483:5740");
        assert!(registry.lookup(&PlotterKey::new(0x0483, 0x5741)).is_none());
        assert_eq!(registry.len(), BUILTIN_PLOTTERS.len());
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = PlotterRegistry::from_profiles([PlotterProfile::new(
            PlotterKey::new(0x1234, 0x5678),
            "Test",
            None,
        )]);
        assert!(registry.lookup(&"1234:5678".parse().unwrap()).is_some());
        assert!(registry.lookup(&"1234:567".parse().unwrap()).is_none());
        assert!(registry.lookup(&"1234:0000".parse().unwrap()).is_none());
    }

    #[test]
    fn test_from_json_normalizes_keys() {
        let registry = PlotterRegistry::from_json_str(
            r#"[{"key":"ABCD:00EF","display_name":"Big cutter","icon_ref":"big"},
                {"key":"0001:0002","name":"Small cutter"}]"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        let big = registry.lookup(&PlotterKey::new(0xabcd, 0x00ef)).unwrap();
        assert_eq!(big.display_name, "Big cutter");
        assert_eq!(registry.profiles()[0].display_name, "Small cutter");
    }

    #[test]
    fn test_from_json_rejects_duplicates_and_bad_keys() {
        let dup = r#"[{"key":"0001:0002","name":"A"},{"key":"0001:0002","name":"B"}]"#;
        assert!(matches!(
            PlotterRegistry::from_json_str(dup),
            Err(ConfigError::Invalid { .. })
        ));

        let bad = r#"[{"key":"nope","name":"A"}]"#;
        assert!(matches!(PlotterRegistry::from_json_str(bad), Err(ConfigError::Parse(_))));
    }
}
