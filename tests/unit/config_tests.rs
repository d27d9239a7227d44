// Config loading through the public API

use reelfork::config::{Config, ConfigError, LogFormat};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_config_can_be_loaded_from_file_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
cache:
  dir: /tmp/reelfork-unit
fetch:
  connect_timeout_secs: 3
logging:
  format: json
"#
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.cache.dir, Some(PathBuf::from("/tmp/reelfork-unit")));
    assert_eq!(config.fetch.connect_timeout_secs, 3);
    assert_eq!(config.fetch.read_timeout_secs, 15);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_rejects_invalid_values() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "cache:\n  preview_size_bytes: 0").unwrap();

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("preview_size_bytes"));
}

#[test]
fn test_load_rejects_malformed_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "cache: [not, a, mapping").unwrap();

    assert!(matches!(
        Config::load(Some(file.path())),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_config_roundtrips_through_yaml() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert_eq!(Config::from_yaml_with_env(&yaml).unwrap(), config);
}
