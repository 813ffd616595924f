//! Tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MEALPLAN_ROOT are marked with #[serial].

use mealplan_common::config::{
    RootFolderInitializer, RootFolderResolver, TomlConfig, DEFAULT_CATEGORY_THRESHOLD,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.categorizer.threshold, DEFAULT_CATEGORY_THRESHOLD);
    assert!(config.categorizer.model_path.is_none());
    assert!(config.root_folder.is_none());
}

#[test]
fn test_parse_partial_config_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/mealplan"

        [categorizer]
        threshold = 0.75
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/mealplan")));
    assert_eq!(config.categorizer.threshold, 0.75);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.event_bus_capacity, 256);
}

#[test]
fn test_threshold_out_of_range_is_rejected() {
    let result = TomlConfig::from_toml_str("[categorizer]\nthreshold = 1.5\n");
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = TomlConfig::from_toml_str("root_folder = [");
    assert!(matches!(result, Err(mealplan_common::Error::Config(_))));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(TomlConfig::load(Some(&missing)).is_err());
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/config")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new(Some(Path::new("/from/cli")), &config).resolve();
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_config_file() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/config")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_config_file_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/config")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/from/config"));
}

#[test]
#[serial]
fn test_default_root_folder_when_nothing_set() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig::default();

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert!(resolved.ends_with("mealplan") || resolved.ends_with("mealplan_data"));
}

#[test]
fn test_initializer_creates_directory_and_names_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("mealplan.db"));
    assert_eq!(initializer.household_key_path(), root.join("household_key"));
    assert_eq!(
        initializer.resolve_path(Path::new("lexicon.toml")),
        root.join("lexicon.toml")
    );
    assert_eq!(
        initializer.resolve_path(Path::new("/abs/lexicon.toml")),
        PathBuf::from("/abs/lexicon.toml")
    );
}
