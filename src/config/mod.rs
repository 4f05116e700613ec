// Configuration management: TOML settings and their console rendering

pub mod display;
pub mod settings;

#[cfg(test)]
mod tests;

pub use display::{init_config, show_config};
pub use settings::{
    Config, ConfigError, CrawlerConfig, EmbeddingConfig, ExtractionConfig, LoggingConfig,
    PolicyKind, ProviderKind,
};

/// Resolve the data directory, preferring an explicit override
#[inline]
pub fn resolve_data_dir(
    data_dir: Option<&std::path::Path>,
) -> Result<std::path::PathBuf, ConfigError> {
    data_dir.map_or_else(Config::default_data_dir, |dir| Ok(dir.to_path_buf()))
}
