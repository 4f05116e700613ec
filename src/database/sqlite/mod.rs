use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, error, info};

use crate::crawler::CrawlSession;
use crate::database::sqlite::models::{CategoryCount, CheckpointRow, CollectionStats};
use crate::database::sqlite::queries::{CheckpointQueries, ChunkQueries, DocumentQueries};
use crate::database::{ContentChunk, DocumentId, DocumentStore, ExtractedDocument};


pub mod models;
pub mod queries;

pub const DATABASE_FILE: &str = "documents.db";

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Open (creating if needed) `documents.db` inside `data_dir`
    #[inline]
    pub async fn initialize_from_data_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;

        Self::new(data_dir.join(DATABASE_FILE)).await
    }

    #[inline]
    pub async fn document_count(&self) -> Result<i64> {
        DocumentQueries::count(&self.pool).await
    }

    #[inline]
    pub async fn chunk_count(&self) -> Result<i64> {
        ChunkQueries::count(&self.pool).await
    }

    #[inline]
    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        DocumentQueries::count_by_category(&self.pool).await
    }

    #[inline]
    pub async fn collection_stats(&self) -> Result<Vec<CollectionStats>> {
        ChunkQueries::collection_stats(&self.pool).await
    }

    // Checkpoint operations
    #[inline]
    pub async fn save_checkpoint(&self, session: &CrawlSession) -> Result<()> {
        let state =
            serde_json::to_string(session).context("Failed to serialize crawl session")?;

        CheckpointQueries::save(
            &self.pool,
            &session.seed_url,
            &state,
            session.frontier.visited_count(),
            session.frontier.remaining(),
        )
        .await?;

        debug!(
            "Checkpoint saved: {} visited, {} queued",
            session.frontier.visited_count(),
            session.frontier.remaining()
        );
        Ok(())
    }

    #[inline]
    pub async fn checkpoint_info(&self) -> Result<Option<CheckpointRow>> {
        CheckpointQueries::load(&self.pool).await
    }

    #[inline]
    pub async fn load_checkpoint(&self) -> Result<Option<CrawlSession>> {
        let Some(row) = CheckpointQueries::load(&self.pool).await? else {
            return Ok(None);
        };

        let session = serde_json::from_str(&row.state)
            .context("Failed to parse saved crawl session")?;
        Ok(Some(session))
    }

    #[inline]
    pub async fn clear_checkpoint(&self) -> Result<bool> {
        CheckpointQueries::clear(&self.pool).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn save_document(&self, document: &ExtractedDocument) -> Result<DocumentId> {
        DocumentQueries::create(&self.pool, document)
            .await
            .inspect_err(|e| error!("Failed to save document {}: {:#}", document.url, e))
    }

    async fn save_chunk(&self, chunk: &ContentChunk, content_id: &DocumentId) -> Result<()> {
        ChunkQueries::create(&self.pool, chunk, content_id)
            .await
            .map(|_| ())
            .inspect_err(|e| {
                error!(
                    "Failed to save chunk {} of {}: {:#}",
                    chunk.chunk_index, chunk.url, e
                );
            })
    }
}
