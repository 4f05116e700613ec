
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `documents` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StoredDocument {
    pub id: String,
    pub url: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    pub youtube_url: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    /// JSON array of floats
    pub summary_embedding: Option<String>,
    pub created_at: NaiveDateTime,
}

impl StoredDocument {
    #[inline]
    pub fn summary_embedding_vector(&self) -> Result<Option<Vec<f32>>> {
        decode_embedding(self.summary_embedding.as_deref())
    }
}

/// Row of the `chunks` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StoredChunk {
    pub id: i64,
    pub collection: String,
    pub content_id: String,
    pub url: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    pub chunk_index: i64,
    pub start_pointer: i64,
    pub end_pointer: i64,
    pub content: String,
    /// JSON array of floats
    pub embedding: Option<String>,
    pub created_at: NaiveDateTime,
}

impl StoredChunk {
    #[inline]
    pub fn embedding_vector(&self) -> Result<Option<Vec<f32>>> {
        decode_embedding(self.embedding.as_deref())
    }
}

/// The single saved crawl state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CheckpointRow {
    pub seed_url: String,
    /// Serialized `CrawlSession`
    pub state: String,
    pub visited_count: i64,
    pub remaining_count: i64,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CollectionStats {
    pub collection: String,
    pub documents: i64,
    pub chunks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub documents: i64,
}

#[inline]
pub fn encode_embedding(embedding: Option<&[f32]>) -> Result<Option<String>> {
    embedding
        .map(|values| serde_json::to_string(values).context("Failed to serialize embedding"))
        .transpose()
}

#[inline]
pub fn decode_embedding(raw: Option<&str>) -> Result<Option<Vec<f32>>> {
    raw.map(|json| serde_json::from_str(json).context("Failed to parse stored embedding"))
        .transpose()
}
