use kmplot_lib::device::{select_device, PlotterKey, PlotterProfile, PlotterRegistry, SelectedDevice};
use kmplot_lib::serial::DeviceCandidate;

fn registry() -> PlotterRegistry {
    PlotterRegistry::from_profiles([PlotterProfile::new(
        PlotterKey::new(0x0483, 0x5740),
        "Test Cutter",
        Some("cutter"),
    )])
}

#[test]
fn test_first_candidate_selected_when_nothing_previous() {
    let candidates = vec![
        DeviceCandidate::new("COM3", 0x0483, 0x5740),
        DeviceCandidate::new("COM4", 0x1234, 0x5678),
    ];

    let selected = select_device(&candidates, &SelectedDevice::none(), &registry());
    assert_eq!(selected.path.as_deref(), Some("COM3"));
    assert_eq!(selected.key, Some(PlotterKey::new(0x0483, 0x5740)));
    assert!(selected.supported);
}

#[test]
fn test_previous_choice_survives_reordering() {
    let registry = registry();
    let previous = SelectedDevice {
        path: Some("COM4".into()),
        key: Some(PlotterKey::new(0x1234, 0x5678)),
        supported: false,
    };
    let candidates = vec![
        DeviceCandidate::new("COM3", 0x0483, 0x5740),
        DeviceCandidate::new("COM4", 0x1234, 0x5678),
    ];

    let selected = select_device(&candidates, &previous, &registry);
    assert_eq!(selected, previous, "user choice must stick while the port exists");

    let again = select_device(&candidates, &selected, &registry);
    assert_eq!(again, selected, "selection must be idempotent");
}

#[test]
fn test_vanished_previous_falls_back_to_first() {
    let previous = SelectedDevice {
        path: Some("COM9".into()),
        key: Some(PlotterKey::new(0x0483, 0x5740)),
        supported: true,
    };
    let candidates = vec![DeviceCandidate::new("COM4", 0x1234, 0x5678)];

    let selected = select_device(&candidates, &previous, &registry());
    assert_eq!(selected.path.as_deref(), Some("COM4"));
    assert!(!selected.supported);
}

#[test]
fn test_no_candidates_clears_selection() {
    let previous = SelectedDevice {
        path: Some("COM3".into()),
        key: Some(PlotterKey::new(0x0483, 0x5740)),
        supported: true,
    };

    let selected = select_device(&[], &previous, &registry());
    assert_eq!(selected, SelectedDevice::none());
    assert!(!selected.is_present());
}

#[test]
fn test_registry_json_overrides_builtin_table() {
    let json = r#"[{"key": "1a86:7523", "name": "Desk Cutter", "icon": "desk"}]"#;
    let registry = PlotterRegistry::from_json_str(json).unwrap();
    assert_eq!(registry.len(), 1);

    let candidates = vec![DeviceCandidate::new("/dev/ttyUSB0", 0x1a86, 0x7523)];
    let selected = select_device(&candidates, &SelectedDevice::none(), &registry);
    assert!(selected.supported);

    let profile = registry.lookup(&PlotterKey::new(0x1a86, 0x7523)).unwrap();
    assert_eq!(profile.display_name, "Desk Cutter");
}
