// Document store: record types, the store contract and its SQLite implementation

pub mod records;
pub mod sqlite;


use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use records::{ContentChunk, ExtractedDocument, GENERAL, NO_TITLE_FOUND, UNCATEGORIZED};
pub use sqlite::Database;

/// Id of a persisted document. Only a successful document write produces one, so a chunk
/// can never be stored without its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence for full documents and their chunks
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document, stamping its creation time, and return the generated id
    async fn save_document(&self, document: &ExtractedDocument) -> Result<DocumentId>;

    /// Store one chunk in its category's collection under `content_id`
    async fn save_chunk(&self, chunk: &ContentChunk, content_id: &DocumentId) -> Result<()>;
}

/// Collection holding the chunks of a category: lowercase with spaces as underscores
#[inline]
pub fn collection_name(category: &str) -> Result<String> {
    let category = category.trim();
    if category.is_empty() {
        bail!("Category cannot be empty when deriving a collection name");
    }

    Ok(category.replace(' ', "_").to_lowercase())
}
