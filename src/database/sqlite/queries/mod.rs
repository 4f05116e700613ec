
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::database::{ContentChunk, DocumentId, ExtractedDocument, collection_name};

const DOCUMENT_COLUMNS: &str = "id, url, category, sub_category, title, youtube_url, content, \
     summary, summary_embedding, created_at";

const CHUNK_COLUMNS: &str = "id, collection, content_id, url, category, sub_category, title, \
     chunk_index, start_pointer, end_pointer, content, embedding, created_at";

fn to_i64(value: usize, field: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{field} does not fit in an INTEGER column"))
}

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, document: &ExtractedDocument) -> Result<DocumentId> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let summary_embedding = encode_embedding(document.summary_embedding.as_deref())?;

        sqlx::query(
            "INSERT INTO documents (id, url, category, sub_category, title, youtube_url, content, \
             summary, summary_embedding, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&document.url)
        .bind(&document.category)
        .bind(&document.sub_category)
        .bind(&document.title)
        .bind(&document.youtube_url)
        .bind(&document.content)
        .bind(&document.summary)
        .bind(summary_embedding)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to insert document")?;

        debug!("Inserted document {} for {}", id, document.url);
        Ok(DocumentId::new(id))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<StoredDocument>> {
        sqlx::query_as::<_, StoredDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by id")
    }

    #[inline]
    pub async fn list_by_url(pool: &SqlitePool, url: &str) -> Result<Vec<StoredDocument>> {
        sqlx::query_as::<_, StoredDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE url = ? ORDER BY created_at"
        ))
        .bind(url)
        .fetch_all(pool)
        .await
        .context("Failed to list documents by url")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(pool)
            .await
            .context("Failed to count documents")
    }

    #[inline]
    pub async fn count_by_category(pool: &SqlitePool) -> Result<Vec<CategoryCount>> {
        sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) AS documents FROM documents GROUP BY category \
             ORDER BY category",
        )
        .fetch_all(pool)
        .await
        .context("Failed to count documents by category")
    }

    /// Delete a document; its chunks go with it
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    /// Insert a chunk into the collection derived from its category
    #[inline]
    pub async fn create(
        pool: &SqlitePool,
        chunk: &ContentChunk,
        content_id: &DocumentId,
    ) -> Result<i64> {
        let collection = collection_name(&chunk.category)?;
        let embedding = encode_embedding(chunk.embedding.as_deref())?;
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            "INSERT INTO chunks (collection, content_id, url, category, sub_category, title, \
             chunk_index, start_pointer, end_pointer, content, embedding, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&collection)
        .bind(content_id.as_str())
        .bind(&chunk.url)
        .bind(&chunk.category)
        .bind(&chunk.sub_category)
        .bind(&chunk.title)
        .bind(to_i64(chunk.chunk_index, "chunk_index")?)
        .bind(to_i64(chunk.start_pointer, "start_pointer")?)
        .bind(to_i64(chunk.end_pointer, "end_pointer")?)
        .bind(&chunk.content)
        .bind(embedding)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to insert chunk")?
        .last_insert_rowid();

        debug!(
            "Inserted chunk {} of {} into collection {}",
            chunk.chunk_index, content_id, collection
        );
        Ok(id)
    }

    #[inline]
    pub async fn list_for_document(pool: &SqlitePool, content_id: &str) -> Result<Vec<StoredChunk>> {
        sqlx::query_as::<_, StoredChunk>(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE content_id = ? ORDER BY chunk_index"
        ))
        .bind(content_id)
        .fetch_all(pool)
        .await
        .context("Failed to list chunks for document")
    }

    #[inline]
    pub async fn list_by_collection(
        pool: &SqlitePool,
        collection: &str,
    ) -> Result<Vec<StoredChunk>> {
        sqlx::query_as::<_, StoredChunk>(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE collection = ? ORDER BY id"
        ))
        .bind(collection)
        .fetch_all(pool)
        .await
        .context("Failed to list chunks by collection")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count chunks")
    }

    /// Per-collection chunk counts and the number of distinct documents behind them
    #[inline]
    pub async fn collection_stats(pool: &SqlitePool) -> Result<Vec<CollectionStats>> {
        sqlx::query_as::<_, CollectionStats>(
            "SELECT collection, COUNT(DISTINCT content_id) AS documents, COUNT(*) AS chunks \
             FROM chunks GROUP BY collection ORDER BY collection",
        )
        .fetch_all(pool)
        .await
        .context("Failed to get collection statistics")
    }
}

pub struct CheckpointQueries;

impl CheckpointQueries {
    /// Replace the saved checkpoint
    #[inline]
    pub async fn save(
        pool: &SqlitePool,
        seed_url: &str,
        state: &str,
        visited_count: usize,
        remaining_count: usize,
    ) -> Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO crawl_checkpoint (id, seed_url, state, visited_count, remaining_count, \
             updated_at) VALUES (1, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET seed_url = excluded.seed_url, state = excluded.state, \
             visited_count = excluded.visited_count, remaining_count = excluded.remaining_count, \
             updated_at = excluded.updated_at",
        )
        .bind(seed_url)
        .bind(state)
        .bind(to_i64(visited_count, "visited_count")?)
        .bind(to_i64(remaining_count, "remaining_count")?)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to save crawl checkpoint")?;

        Ok(())
    }

    #[inline]
    pub async fn load(pool: &SqlitePool) -> Result<Option<CheckpointRow>> {
        sqlx::query_as::<_, CheckpointRow>(
            "SELECT seed_url, state, visited_count, remaining_count, updated_at \
             FROM crawl_checkpoint WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to load crawl checkpoint")
    }

    #[inline]
    pub async fn clear(pool: &SqlitePool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM crawl_checkpoint")
            .execute(pool)
            .await
            .context("Failed to clear crawl checkpoint")?;

        Ok(result.rows_affected() > 0)
    }
}
