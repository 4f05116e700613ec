use super::*;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn explicit_data_dir_wins() {
    let dir = resolve_data_dir(Some(Path::new("/tmp/diy-data"))).expect("should resolve");
    assert_eq!(dir, Path::new("/tmp/diy-data"));
}

#[test]
fn default_data_dir_is_namespaced() {
    // Headless CI machines may have no data dir at all
    if let Ok(dir) = resolve_data_dir(None) {
        assert!(dir.ends_with("diy-scraper"));
    }
}

#[test]
fn init_then_load_round_trips_through_disk() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    init_config(temp_dir.path()).expect("init should succeed");

    let loaded = Config::load(temp_dir.path()).expect("should load config");
    assert_eq!(loaded.crawler, CrawlerConfig::default());
    assert_eq!(loaded.extraction, ExtractionConfig::default());
    assert_eq!(loaded.embedding, EmbeddingConfig::default());
    assert_eq!(loaded.logging, LoggingConfig::default());
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidUrl("invalid-url".to_string()),
        ConfigError::InvalidTopicQuota(0),
        ConfigError::InvalidMaxTokens(1),
        ConfigError::InvalidModel(String::new()),
        ConfigError::InvalidLogLevel("loud".to_string()),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10);
    }
}
