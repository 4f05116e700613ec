use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::crawler::Topic;
use crate::database::Database;
use crate::embeddings::build_provider;
use crate::orchestrator::{CrawlOptions, CrawlReport, Scraper};

/// Run a crawl with the configuration stored in `data_dir`
#[inline]
pub async fn crawl(data_dir: &Path, options: CrawlOptions) -> Result<CrawlReport> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;
    let dry_run = options.dry_run;

    let scraper = Scraper::new(config).await?;
    let report = scraper.run(options).await?;

    eprintln!();
    eprintln!(
        "{} {}",
        style("Crawl finished for").bold().green(),
        style(&report.seed_url).cyan()
    );
    if report.resumed {
        eprintln!("  Resumed from checkpoint");
    }
    if dry_run {
        eprintln!("  {}", style("Dry run: nothing was stored").yellow());
    }
    eprintln!("  Pages fetched: {}", report.stats.fetched);
    eprintln!("  Documents extracted: {}", report.stats.extracted);
    eprintln!(
        "  Chunks saved: {} ({} failed)",
        report.stats.chunks_saved, report.stats.chunks_failed
    );
    eprintln!("  Skipped pages: {}", report.stats.skipped);
    eprintln!(
        "  Failures: {} fetch, {} page, {} checkpoint",
        report.stats.fetch_failures, report.stats.page_failures, report.stats.checkpoint_failures
    );
    eprintln!(
        "  Frontier: {} visited, {} remaining",
        report.visited, report.remaining
    );
    for topic in Topic::ALL {
        eprintln!("  {}: {}", topic, report.counters.get(topic));
    }

    Ok(report)
}

/// Show document store contents and checkpoint progress
#[inline]
pub async fn show_status(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;

    println!("{}", style("Scraper Status").bold().cyan());
    println!("{}", "=".repeat(50));
    println!();

    let database = Database::initialize_from_data_dir(config.get_base_dir())
        .await
        .context("Failed to open document store")?;
    println!("Database: {}", style(config.database_path().display()).dim());
    println!(
        "  Documents: {}",
        style(database.document_count().await?).cyan()
    );
    println!("  Chunks: {}", style(database.chunk_count().await?).cyan());

    let categories = database.category_counts().await?;
    if !categories.is_empty() {
        println!();
        println!("{}", style("Documents by category:").bold().yellow());
        for entry in categories {
            println!("  {:<30} {}", entry.category, entry.documents);
        }
    }

    let collections = database.collection_stats().await?;
    if !collections.is_empty() {
        println!();
        println!("{}", style("Chunk collections:").bold().yellow());
        for entry in collections {
            println!(
                "  {:<30} {} chunks from {} documents",
                entry.collection, entry.chunks, entry.documents
            );
        }
    }

    println!();
    println!("{}", style("Checkpoint:").bold().yellow());
    match database.checkpoint_info().await? {
        Some(checkpoint) => {
            println!("  Seed: {}", style(&checkpoint.seed_url).cyan());
            println!(
                "  {} visited, {} queued",
                checkpoint.visited_count, checkpoint.remaining_count
            );
            println!("  Updated: {}", checkpoint.updated_at);
        }
        None => println!("  {}", style("none").dim()),
    }

    Ok(())
}

/// Verify the database opens and the embedding provider answers
#[inline]
pub async fn check(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    println!("{} Configuration is valid", style("✓").green());

    Database::initialize_from_data_dir(config.get_base_dir())
        .await
        .context("Failed to open document store")?;
    println!(
        "{} Database opened at {}",
        style("✓").green(),
        config.database_path().display()
    );

    match build_provider(&config.embedding)? {
        Some(provider) => {
            provider.health_check().await.with_context(|| {
                format!("Embedding provider {} is not healthy", provider.name())
            })?;
            println!(
                "{} Embedding provider {} is reachable with model {}",
                style("✓").green(),
                provider.name(),
                config.embedding.model
            );
        }
        None => println!("{} Embeddings disabled", style("-").dim()),
    }

    info!("Health check completed");
    Ok(())
}
