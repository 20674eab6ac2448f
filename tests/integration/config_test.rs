use rocm_top::core::config::MonitorConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = MonitorConfig::default();
    assert_eq!(config.interval_ms, 1000);
    assert_eq!(config.cpu_sample_window_ms, 100);
    assert_eq!(config.enrich_workers, 8);
    assert_eq!(config.command_width, 100);
}

#[test]
fn test_config_load_nonexistent_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = MonitorConfig::load_from(&temp_dir.path().join("config.json")).unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rocm-top").join("config.json");

    let config = MonitorConfig {
        interval_ms: 2000,
        cpu_sample_window_ms: 250,
        enrich_workers: 4,
        command_width: 60,
    };
    config.save_to(&path).unwrap();

    assert!(path.exists());
    assert_eq!(MonitorConfig::load_from(&path).unwrap(), config);
}

#[test]
fn test_config_empty_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "").unwrap();

    assert_eq!(MonitorConfig::load_from(&path).unwrap(), MonitorConfig::default());
}

#[test]
fn test_config_corrupt_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "{ interval_ms: ").unwrap();

    assert_eq!(MonitorConfig::load_from(&path).unwrap(), MonitorConfig::default());
}

#[test]
fn test_config_file_values_are_clamped() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{"interval_ms": 1, "enrich_workers": 0}"#).unwrap();

    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config.interval_ms, 100);
    assert_eq!(config.enrich_workers, 1);
    assert_eq!(config.command_width, 100);
}
