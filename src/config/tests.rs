use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn config_file_persistence() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let mut original_config =
        Config::load(temp_dir.path()).expect("missing config file should yield defaults");
    original_config.elasticsearch.host = "search-box".to_string();
    original_config.ollama.chat_model = "llama3.1".to_string();
    original_config.watcher.debounce_ms = 500;

    original_config.save().expect("should save config");

    let loaded = Config::load(temp_dir.path()).expect("should load saved config");
    assert_eq!(loaded, original_config);
}

#[test]
fn missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.elasticsearch, ElasticsearchConfig::default());
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn invalid_config_file_rejected() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "[elasticsearch]\nport = 0\n").expect("should write config file");

    assert!(Config::load(temp_dir.path()).is_err());
}
