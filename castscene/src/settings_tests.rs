use crate::Settings;

#[test]
fn defaults_enable_everything_but_time_and_reset() {
    let settings = Settings::default();
    assert!(!settings.import_at_time);
    assert!(settings.import_skin);
    assert!(!settings.import_reset);
    assert!(settings.import_ik);
    assert!(settings.import_constraints);
    assert!(settings.export_anim);
    assert!(settings.export_model);
}

#[test]
fn partial_json_keeps_defaults_for_missing_keys() {
    let settings = Settings::from_json(r#"{"importReset": true, "importIK": false}"#).unwrap();
    assert!(settings.import_reset);
    assert!(!settings.import_ik);
    assert!(settings.import_skin);
    assert!(settings.export_model);
}

#[test]
fn json_uses_persisted_key_names() {
    let json = Settings::default().to_json().unwrap();
    for key in [
        "importAtTime",
        "importSkin",
        "importReset",
        "importIK",
        "importConstraints",
        "exportAnim",
        "exportModel",
    ] {
        assert!(json.contains(key), "missing {key} in {json}");
    }
    assert_eq!(Settings::from_json(&json).unwrap(), Settings::default());
}

#[test]
fn set_by_key() {
    let mut settings = Settings::default();
    assert!(settings.set("importSkin", false));
    assert!(settings.set("importAtTime", true));
    assert!(!settings.set("importCameras", true));
    assert!(!settings.import_skin);
    assert!(settings.import_at_time);
}

#[test]
fn unreadable_files_fall_back_to_defaults() {
    let dir = std::env::temp_dir();
    let missing = dir.join("castscene-no-such-settings.json");
    assert_eq!(Settings::load(&missing), Settings::default());

    let broken = dir.join(format!("castscene-broken-{}.json", std::process::id()));
    std::fs::write(&broken, "{ not json").unwrap();
    let loaded = Settings::load(&broken);
    let _ = std::fs::remove_file(&broken);
    assert_eq!(loaded, Settings::default());
}

#[test]
fn save_then_load() {
    let path = std::env::temp_dir().join(format!("castscene-settings-{}.json", std::process::id()));
    let mut settings = Settings::default();
    settings.set("exportAnim", false);
    settings.save(&path);
    let loaded = Settings::load(&path);
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded, settings);
}
