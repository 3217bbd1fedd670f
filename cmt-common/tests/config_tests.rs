//! Unit tests for configuration resolution
//!
//! Covers the priority order (CLI > environment > TOML > compiled defaults)
//! and graceful handling of missing config files.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CMT_* variables are marked with #[serial].

use cmt_common::config::{
    CompiledDefaults, Config, ConfigOverrides, TomlConfig, ENV_CACHE_DIR, ENV_DATABASE_PATH,
    ENV_DETECTOR,
};
use cmt_common::DetectorGeneration;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn clear_env() {
    env::remove_var(ENV_DATABASE_PATH);
    env::remove_var(ENV_CACHE_DIR);
    env::remove_var(ENV_DETECTOR);
}

fn toml_with_everything() -> TomlConfig {
    toml::from_str(
        r#"
        database_path = "/from/toml.db"
        detector = "xenon1t"
        cache_dir = "/from/toml-cache"
        "#,
    )
    .unwrap()
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.database_path.as_os_str().is_empty());
    assert_eq!(defaults.cache_dir, PathBuf::from("./resource_cache"));
    assert_eq!(defaults.cacheable_versions, vec!["ONLINE".to_string()]);
    assert_eq!(defaults.detector, DetectorGeneration::Xenonnt);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_no_sources_uses_defaults() {
    clear_env();

    let config = Config::resolve(TomlConfig::default(), ConfigOverrides::default()).unwrap();
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(config.database_path, defaults.database_path);
    assert_eq!(config.cache_dir, defaults.cache_dir);
    assert_eq!(config.detector, defaults.detector);
}

#[test]
#[serial]
fn test_toml_beats_defaults() {
    clear_env();

    let config = Config::resolve(toml_with_everything(), ConfigOverrides::default()).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/from/toml.db"));
    assert_eq!(config.cache_dir, PathBuf::from("/from/toml-cache"));
    assert_eq!(config.detector, DetectorGeneration::Xenon1t);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    clear_env();
    env::set_var(ENV_DATABASE_PATH, "/from/env.db");
    env::set_var(ENV_CACHE_DIR, "/from/env-cache");
    env::set_var(ENV_DETECTOR, "xenonnt");

    let config = Config::resolve(toml_with_everything(), ConfigOverrides::default()).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/from/env.db"));
    assert_eq!(config.cache_dir, PathBuf::from("/from/env-cache"));
    assert_eq!(config.detector, DetectorGeneration::Xenonnt);

    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env();
    env::set_var(ENV_DATABASE_PATH, "/from/env.db");

    let overrides = ConfigOverrides {
        database_path: Some(PathBuf::from("/from/cli.db")),
        detector: Some(DetectorGeneration::Xenon1t),
        ..Default::default()
    };
    let config = Config::resolve(TomlConfig::default(), overrides).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/from/cli.db"));
    assert_eq!(config.detector, DetectorGeneration::Xenon1t);

    clear_env();
}

#[test]
#[serial]
fn test_bad_detector_env_is_error() {
    clear_env();
    env::set_var(ENV_DETECTOR, "lux");

    let result = Config::resolve(TomlConfig::default(), ConfigOverrides::default());
    assert!(result.is_err());

    clear_env();
}

#[test]
#[serial]
fn test_load_explicit_config_file() {
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        database_path = "/explicit.db"
        cacheable_versions = ["ONLINE", "v3"]

        [logging]
        level = "debug"
        "#
    )
    .unwrap();

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(overrides).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/explicit.db"));
    assert_eq!(config.cacheable_versions, vec!["ONLINE", "v3"]);
    assert_eq!(config.log_level, "debug");
}

#[test]
#[serial]
fn test_explicit_missing_config_file_is_error() {
    clear_env();

    let overrides = ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/cmt/config.toml")),
        ..Default::default()
    };

    assert!(Config::load(overrides).is_err());
}

#[test]
fn test_malformed_toml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "database_path = [").unwrap();

    let result = cmt_common::config::read_toml_config(file.path());
    assert!(result.is_err());
}
