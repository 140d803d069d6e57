use super::{PlotterRegistry, SelectedDevice};
use crate::serial::DeviceCandidate;

/// Pick the device to target from one enumeration pass.
///
/// Keeps the previous path while it is still present; otherwise takes the first
/// candidate in enumeration order.
pub fn select_device(
    candidates: &[DeviceCandidate],
    previous: &SelectedDevice,
    registry: &PlotterRegistry,
) -> SelectedDevice {
    let chosen = previous
        .path
        .as_deref()
        .and_then(|path| candidates.iter().find(|c| c.path == path))
        .or_else(|| candidates.first());

    match chosen {
        Some(candidate) => resolve(candidate, registry),
        None => SelectedDevice::none(),
    }
}

/// Explicit choice of `path`; None if it was not enumerated
pub fn select_path(
    candidates: &[DeviceCandidate],
    path: &str,
    registry: &PlotterRegistry,
) -> Option<SelectedDevice> {
    candidates
        .iter()
        .find(|c| c.path == path)
        .map(|candidate| resolve(candidate, registry))
}

fn resolve(candidate: &DeviceCandidate, registry: &PlotterRegistry) -> SelectedDevice {
    let key = candidate.key();
    SelectedDevice {
        path: Some(candidate.path.clone()),
        supported: registry.lookup(&key).is_some(),
        key: Some(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PlotterKey, PlotterProfile};

    fn registry() -> PlotterRegistry {
        PlotterRegistry::from_profiles([PlotterProfile::new(
            PlotterKey::new(0x0483, 0x5740),
            "Cutter",
            None,
        )])
    }

    fn previous(path: &str) -> SelectedDevice {
        SelectedDevice {
            path: Some(path.to_string()),
            key: None,
            supported: false,
        }
    }

    #[test]
    fn test_empty_candidates() {
        let selected = select_device(&[], &previous("COM3"), &registry());
        assert_eq!(selected, SelectedDevice::none());
        assert!(!selected.supported);
    }

    #[test]
    fn test_supported_candidate() {
        let candidates = [DeviceCandidate::new("COM3", 0x0483, 0x5740)];
        let selected = select_device(&candidates, &SelectedDevice::none(), &registry());
        assert_eq!(selected.path.as_deref(), Some("COM3"));
        assert_eq!(selected.key, Some(PlotterKey::new(0x0483, 0x5740)));
        assert!(selected.supported);
    }

    #[test]
    fn test_unsupported_candidate_still_selected() {
        let candidates = [DeviceCandidate::new("COM4", 0x1a86, 0x7523)];
        let selected = select_device(&candidates, &SelectedDevice::none(), &registry());
        assert_eq!(selected.path.as_deref(), Some("COM4"));
        assert!(!selected.supported);
    }

    #[test]
    fn test_previous_path_is_sticky() {
        let candidates = [
            DeviceCandidate::new("COM1", 0x1a86, 0x7523),
            DeviceCandidate::new("COM3", 0x0483, 0x5740),
        ];
        let selected = select_device(&candidates, &previous("COM3"), &registry());
        assert_eq!(selected.path.as_deref(), Some("COM3"));

        let reversed = [candidates[1].clone(), candidates[0].clone()];
        let selected = select_device(&reversed, &previous("COM1"), &registry());
        assert_eq!(selected.path.as_deref(), Some("COM1"));
    }

    #[test]
    fn test_vanished_previous_falls_back_to_first() {
        let candidates = [
            DeviceCandidate::new("COM5", 0x0483, 0x5740),
            DeviceCandidate::new("COM6", 0x1a86, 0x7523),
        ];
        let selected = select_device(&candidates, &previous("COM9"), &registry());
        assert_eq!(selected.path.as_deref(), Some("COM5"));
    }

    #[test]
    fn test_idempotent() {
        let candidates = [
            DeviceCandidate::new("COM1", 0x1a86, 0x7523),
            DeviceCandidate::new("COM3", 0x0483, 0x5740),
        ];
        let prev = previous("COM3");
        let first = select_device(&candidates, &prev, &registry());
        let second = select_device(&candidates, &prev, &registry());
        assert_eq!(first, second);

        // Feeding the output back in is a fixed point
        assert_eq!(select_device(&candidates, &first, &registry()), first);
    }

    #[test]
    fn test_select_path() {
        let candidates = [
            DeviceCandidate::new("COM1", 0x1a86, 0x7523),
            DeviceCandidate::new("COM3", 0x0483, 0x5740),
        ];
        let selected = select_path(&candidates, "COM3", &registry()).unwrap();
        assert!(selected.supported);
        assert!(select_path(&candidates, "COM8", &registry()).is_none());
    }
}
