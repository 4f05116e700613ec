
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::DEFAULT_MAX_TOKENS;

const APP_DIR_NAME: &str = "diy-scraper";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Which stop rule drives the crawl
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Stop once every topic has reached `topic_quota` extracted pages
    #[default]
    TopicQuota,
    /// Stop once `max_pages` URLs have been visited
    PageLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First URL placed on the frontier
    pub seed_url: String,
    /// Substring a link must contain to be followed when a page has no sitemap listing
    pub site_domain: String,
    /// URLs that are never fetched
    pub blacklist: Vec<String>,
    pub policy: PolicyKind,
    pub topic_quota: usize,
    pub max_pages: usize,
    /// Every Nth iteration a random frontier entry is taken instead of the head
    pub random_jump_frequency: usize,
    /// Progress is logged (and checkpointed) every N processed pages
    pub log_frequency: usize,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Minimum delay between two requests in milliseconds
    pub rate_limit_ms: u64,
    /// Extra attempts after a retryable fetch failure
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    /// Fixed seed for the random jump, for reproducible crawls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for CrawlerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            seed_url: "https://www.instructables.com/sitemap".to_string(),
            site_domain: "www.instructables.com".to_string(),
            blacklist: default_blacklist(),
            policy: PolicyKind::TopicQuota,
            topic_quota: 1000,
            max_pages: 6000,
            random_jump_frequency: 50,
            log_frequency: 100,
            user_agent: "diy-scraper/0.1.0 (Project Indexer)".to_string(),
            timeout_seconds: 30,
            rate_limit_ms: 250,
            max_retries: 3,
            retry_delay_seconds: 5,
            rng_seed: None,
        }
    }
}

fn default_blacklist() -> Vec<String> {
    [
        "https://www.instructables.com/",
        "https://www.instructables.com/projects/",
        "https://www.instructables.com/contest/",
        "https://www.instructables.com/teachers/",
        "https://www.instructables.com/contact/",
        "https://www.instructables.com/about/",
        "https://www.instructables.com/create/",
        "https://www.instructables.com/sitemap/",
        "https://www.instructables.com/circuits/",
        "https://www.instructables.com/workshop/",
        "https://www.instructables.com/craft/",
        "https://www.instructables.com/cooking/",
        "https://www.instructables.com/living/",
        "https://www.instructables.com/outside/",
        "https://www.instructables.com/How-to-Write-a-Great-Instructable/",
        "https://www.instagram.com/instructables/",
        "https://www.tiktok.com/@instructables",
        "https://www.autodesk.com/",
        "https://www.autodesk.com/company/legal-notices-trademarks/privacy-statement",
        "https://www.autodesk.com/company/legal-notices-trademarks",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Sentences kept by the extractive summary
    pub summary_sentences: usize,
    /// Upper bound on tokens per chunk
    pub max_tokens: usize,
    /// Persist documents when true, print them when false
    pub save_content: bool,
    /// Substrings that identify an embedded video source
    pub video_markers: Vec<String>,
}

impl Default for ExtractionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            summary_sentences: 5,
            max_tokens: DEFAULT_MAX_TOKENS,
            save_content: true,
            video_markers: vec!["youtube".to_string(), "youtu.be".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Cohere,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the provider's API key
    pub api_key_env: String,
    pub requests_per_minute: u32,
    /// Fixed pause after every embedding call in milliseconds
    pub delay_ms: u64,
    pub retry_attempts: u32,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderKind::Cohere,
            model: "embed-english-light-v3.0".to_string(),
            base_url: "https://api.cohere.com".to_string(),
            api_key_env: "COHERE_API_KEY".to_string(),
            requests_per_minute: 1000,
            delay_ms: 50,
            retry_attempts: 3,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Mirror log output to stderr
    pub console: bool,
    /// Directory for per-run log files; `<data dir>/logs` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            directory: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Data directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid site domain: {0:?} (cannot be empty)")]
    InvalidSiteDomain(String),
    #[error("Invalid topic quota: {0} (must be at least 1)")]
    InvalidTopicQuota(usize),
    #[error("Invalid page limit: {0} (must be at least 1)")]
    InvalidMaxPages(usize),
    #[error("Invalid random jump frequency: {0} (must be at least 1)")]
    InvalidJumpFrequency(usize),
    #[error("Invalid log frequency: {0} (must be at least 1)")]
    InvalidLogFrequency(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry count: {0} (must be at most 10)")]
    InvalidRetries(u32),
    #[error("Invalid summary sentence count: {0} (must be between 1 and 50)")]
    InvalidSummarySentences(usize),
    #[error("Invalid max tokens: {0} (must be between 16 and 8192)")]
    InvalidMaxTokens(usize),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid requests per minute: {0} (must be between 1 and 100000)")]
    InvalidRequestsPerMinute(u32),
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when it does not exist
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!("Failed to create data directory: {}", config_dir.display())
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Platform data directory for the application
    #[inline]
    pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawler.validate()?;
        self.extraction.validate()?;
        self.embedding.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the SQLite document store
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join("documents.db")
    }

    #[inline]
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .directory
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("logs"))
    }
}

impl CrawlerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seed = Url::parse(&self.seed_url)
            .map_err(|_| ConfigError::InvalidUrl(self.seed_url.clone()))?;
        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(self.seed_url.clone()));
        }

        if self.site_domain.trim().is_empty() {
            return Err(ConfigError::InvalidSiteDomain(self.site_domain.clone()));
        }

        if self.topic_quota == 0 {
            return Err(ConfigError::InvalidTopicQuota(self.topic_quota));
        }

        if self.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages(self.max_pages));
        }

        if self.random_jump_frequency == 0 {
            return Err(ConfigError::InvalidJumpFrequency(
                self.random_jump_frequency,
            ));
        }

        if self.log_frequency == 0 {
            return Err(ConfigError::InvalidLogFrequency(self.log_frequency));
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if self.max_retries > 10 {
            return Err(ConfigError::InvalidRetries(self.max_retries));
        }

        Ok(())
    }
}

impl ExtractionConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.summary_sentences) {
            return Err(ConfigError::InvalidSummarySentences(
                self.summary_sentences,
            ));
        }

        if !(16..=8192).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        Ok(())
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=100_000).contains(&self.requests_per_minute) {
            return Err(ConfigError::InvalidRequestsPerMinute(
                self.requests_per_minute,
            ));
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetries(self.retry_attempts));
        }

        Ok(())
    }

    #[inline]
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }
}

impl LoggingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

        if !LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        Ok(())
    }
}
