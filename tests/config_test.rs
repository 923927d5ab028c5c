//! Integration tests for configuration loading

use leftbehind::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[world_model]
host = "wm.test.local"
client_port = 8010
solver_port = 8009
connect_timeout_ms = 1000
publish_timeout_ms = 500

[watch]
required_items = ["wallet", "keys", "badge"]
doors = ["front door"]
mobility_attributes = ["mobility"]
door_attributes = ["closed"]
delay_tolerance_secs = 45

[alert]
attribute = "forgotten"
origin = "test-solver"
suppress_all_missing = false

[poll]
interval_ms = 25
reconnect_delay_ms = 250

[stats]
interval_secs = 5
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.host(), "wm.test.local");
    assert_eq!(config.client_port(), 8010);
    assert_eq!(config.solver_port(), 8009);
    assert_eq!(config.connect_timeout_ms(), 1000);
    assert_eq!(config.publish_timeout_ms(), 500);
    assert_eq!(config.required_items(), &["wallet", "keys", "badge"]);
    assert_eq!(config.doors(), &["front door"]);
    assert_eq!(config.delay_tolerance_secs(), 45);
    assert_eq!(config.delay_tolerance_ms(), 45_000);
    assert_eq!(config.alert_attribute(), "forgotten");
    assert_eq!(config.origin(), "test-solver");
    assert!(!config.suppress_all_missing());
    assert_eq!(config.poll_interval_ms(), 25);
    assert_eq!(config.reconnect_delay_ms(), 250);
    assert_eq!(config.stats_interval_secs(), 5);
}

#[test]
fn test_missing_file_is_an_error() {
    let err = Config::from_file("/nonexistent/leftbehind.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_empty_watch_set_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let config_content = r#"
[world_model]
host = "localhost"

[watch]
required_items = []
doors = ["front door"]
"#;
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
