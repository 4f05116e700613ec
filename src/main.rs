use clap::{Parser, Subcommand};
use diy_scraper::commands::{check, crawl, show_status};
use diy_scraper::config::{Config, init_config, resolve_data_dir, show_config};
use diy_scraper::orchestrator::CrawlOptions;
use diy_scraper::{Result, ScraperError, logging};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "diy-scraper")]
#[command(about = "Crawl a DIY project site into a searchable document store")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the database and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from the seed URL, extracting and storing project pages
    Crawl {
        /// Override the configured seed URL
        #[arg(long)]
        seed: Option<String>,
        /// Override the per-topic page quota
        #[arg(long)]
        quota: Option<usize>,
        /// Print extracted documents instead of storing them
        #[arg(long)]
        dry_run: bool,
        /// Continue from the saved checkpoint
        #[arg(long)]
        resume: bool,
    },
    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "init")]
        show: bool,
        /// Write a default config.toml
        #[arg(long)]
        init: bool,
    },
    /// Show stored documents, collections and checkpoint progress
    Status,
    /// Check the database and embedding provider
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir =
        resolve_data_dir(cli.data_dir.as_deref()).map_err(|e| ScraperError::Config(e.to_string()))?;

    if let Commands::Config { init, .. } = cli.command {
        if init {
            init_config(&data_dir)?;
        } else {
            show_config(&data_dir)?;
        }
        return Ok(());
    }

    let config = load_config(&data_dir)?;
    let _guard = logging::init(&config.logging, &config.log_dir())?;

    match cli.command {
        Commands::Crawl {
            seed,
            quota,
            dry_run,
            resume,
        } => {
            let options = CrawlOptions {
                seed_url: seed,
                topic_quota: quota,
                dry_run,
                resume,
            };
            crawl(&data_dir, options)
                .await
                .map_err(|e| ScraperError::Crawler(format!("{:#}", e)))?;
        }
        Commands::Status => {
            show_status(&data_dir)
                .await
                .map_err(|e| ScraperError::Database(format!("{:#}", e)))?;
        }
        Commands::Check => {
            check(&data_dir).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load_config(data_dir: &Path) -> Result<Config> {
    Config::load(data_dir).map_err(|e| ScraperError::Config(format!("{:#}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn crawl_defaults() {
        let cli = Cli::try_parse_from(["diy-scraper", "crawl"]).expect("parse should succeed");

        let Commands::Crawl {
            seed,
            quota,
            dry_run,
            resume,
        } = cli.command
        else {
            panic!("expected crawl command");
        };
        assert_eq!(seed, None);
        assert_eq!(quota, None);
        assert!(!dry_run);
        assert!(!resume);
        assert_eq!(cli.data_dir, None);
    }

    #[test]
    fn crawl_with_overrides() {
        let cli = Cli::try_parse_from([
            "diy-scraper",
            "crawl",
            "--seed",
            "https://www.instructables.com/circuits/",
            "--quota",
            "25",
            "--dry-run",
            "--resume",
        ])
        .expect("parse should succeed");

        let Commands::Crawl {
            seed,
            quota,
            dry_run,
            resume,
        } = cli.command
        else {
            panic!("expected crawl command");
        };
        assert_eq!(
            seed.as_deref(),
            Some("https://www.instructables.com/circuits/")
        );
        assert_eq!(quota, Some(25));
        assert!(dry_run);
        assert!(resume);
    }

    #[test]
    fn data_dir_is_global() {
        let cli = Cli::try_parse_from(["diy-scraper", "status", "--data-dir", "/tmp/scrape"])
            .expect("parse should succeed");

        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/scrape")));
    }

    #[test]
    fn config_flags() {
        let cli = Cli::try_parse_from(["diy-scraper", "config", "--init"])
            .expect("parse should succeed");
        assert!(matches!(
            cli.command,
            Commands::Config {
                show: false,
                init: true
            }
        ));

        let conflict = Cli::try_parse_from(["diy-scraper", "config", "--show", "--init"]);
        assert!(conflict.is_err());
    }

    #[test]
    fn quota_must_be_a_number() {
        let cli = Cli::try_parse_from(["diy-scraper", "crawl", "--quota", "many"]);
        assert!(cli.is_err());
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["diy-scraper", "invalid"]);

        let Err(err) = cli else {
            panic!("invalid subcommand should not parse");
        };
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["diy-scraper", "--help"]);

        let Err(err) = cli else {
            panic!("help should short-circuit parsing");
        };
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn broken_config_is_a_configuration_error() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("config.toml"), "[crawler\nseed_url = ")
            .expect("Failed to write config");

        let Err(err) = load_config(temp_dir.path()) else {
            panic!("malformed config should not load");
        };
        assert!(matches!(err, ScraperError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
