
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use super::{Config, PolicyKind};

/// Print the effective configuration for `data_dir`
#[inline]
pub fn show_config(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Crawler:").bold().yellow());
    eprintln!("  Seed URL: {}", style(&config.crawler.seed_url).cyan());
    eprintln!("  Site domain: {}", style(&config.crawler.site_domain).cyan());
    match config.crawler.policy {
        PolicyKind::TopicQuota => eprintln!(
            "  Stop rule: {} per topic",
            style(config.crawler.topic_quota).cyan()
        ),
        PolicyKind::PageLimit => eprintln!(
            "  Stop rule: {} pages",
            style(config.crawler.max_pages).cyan()
        ),
    }
    eprintln!(
        "  Random jump every: {} iterations",
        style(config.crawler.random_jump_frequency).cyan()
    );
    eprintln!(
        "  Blacklisted URLs: {}",
        style(config.crawler.blacklist.len()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Extraction:").bold().yellow());
    eprintln!(
        "  Summary sentences: {}",
        style(config.extraction.summary_sentences).cyan()
    );
    eprintln!(
        "  Max tokens per chunk: {}",
        style(config.extraction.max_tokens).cyan()
    );
    eprintln!(
        "  Save content: {}",
        style(config.extraction.save_content).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embedding:").bold().yellow());
    if config.embedding.enabled {
        eprintln!("  Provider: {:?}", style(config.embedding.provider).cyan());
        eprintln!("  Model: {}", style(&config.embedding.model).cyan());
        eprintln!("  Endpoint: {}", style(&config.embedding.base_url).cyan());
        eprintln!(
            "  Rate: {} requests/minute, {} ms between calls",
            style(config.embedding.requests_per_minute).cyan(),
            style(config.embedding.delay_ms).cyan()
        );
    } else {
        eprintln!("  {}", style("disabled").dim());
    }

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());
    eprintln!("Database: {}", style(config.database_path().display()).dim());
    eprintln!("Logs: {}", style(config.log_dir().display()).dim());

    Ok(())
}

/// Write a default `config.toml` into `data_dir` unless one already exists.
///
/// Returns `false` when an existing file was left untouched.
#[inline]
pub fn init_config(data_dir: &Path) -> Result<bool> {
    let config = Config {
        base_dir: data_dir.to_path_buf(),
        ..Config::default()
    };

    if config.config_file_path().exists() {
        eprintln!(
            "{}",
            style("Configuration already exists, leaving it untouched.").yellow()
        );
        return Ok(false);
    }

    config.save().context("Failed to save configuration")?;
    eprintln!(
        "{} {}",
        style("Configuration written to").green(),
        style(config.config_file_path().display()).cyan()
    );

    Ok(true)
}
