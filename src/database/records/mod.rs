
use serde::{Deserialize, Serialize};

use crate::crawler::PageMetadata;
use crate::embeddings::TextChunk;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const GENERAL: &str = "General";
pub const NO_TITLE_FOUND: &str = "No Title Found";

/// A page worth keeping, with metadata sentinels already applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub url: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    pub youtube_url: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    pub summary_embedding: Option<Vec<f32>>,
}

impl ExtractedDocument {
    #[inline]
    pub fn new(url: impl Into<String>, metadata: PageMetadata, content: String) -> Self {
        Self {
            url: url.into(),
            category: metadata
                .category
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            sub_category: metadata.sub_category.unwrap_or_else(|| GENERAL.to_string()),
            title: metadata.title.unwrap_or_else(|| NO_TITLE_FOUND.to_string()),
            youtube_url: None,
            content,
            summary: None,
            summary_embedding: None,
        }
    }

    #[inline]
    pub fn with_video(mut self, youtube_url: Option<String>) -> Self {
        self.youtube_url = youtube_url;
        self
    }

    /// Store the summary as its sentences joined by single spaces
    #[inline]
    pub fn set_summary(&mut self, sentences: &[String]) {
        let joined = sentences.join(" ");
        self.summary = (!joined.trim().is_empty()).then_some(joined);
    }
}

/// One token window of a document, destined for its category's collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub url: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    /// 1-based position within the document
    pub chunk_index: usize,
    pub start_pointer: usize,
    pub end_pointer: usize,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

impl ContentChunk {
    #[inline]
    pub fn from_text_chunk(document: &ExtractedDocument, chunk: TextChunk) -> Self {
        Self {
            url: document.url.clone(),
            category: document.category.clone(),
            sub_category: document.sub_category.clone(),
            title: document.title.clone(),
            chunk_index: chunk.chunk_index,
            start_pointer: chunk.start_token,
            end_pointer: chunk.end_token,
            content: chunk.text,
            embedding: None,
        }
    }
}
