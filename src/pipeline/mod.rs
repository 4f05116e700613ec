// Per-page extraction: text, metadata, summary, chunks and embeddings, then persistence


use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::crawler::{PageHandler, PageOutcome, parse_page};
use crate::database::{ContentChunk, DocumentStore, ExtractedDocument};
use crate::embeddings::{EmbedMode, EmbeddingProvider, chunk_text};
use crate::summarizer::summarize;

/// A document and its chunks, ready to store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedPage {
    pub document: ExtractedDocument,
    pub chunks: Vec<ContentChunk>,
}

pub struct ContentPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    summary_sentences: usize,
    max_tokens: usize,
    save_content: bool,
    video_markers: Vec<String>,
}

impl ContentPipeline {
    #[inline]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            summary_sentences: config.summary_sentences,
            max_tokens: config.max_tokens,
            save_content: config.save_content,
            video_markers: config.video_markers.clone(),
        }
    }

    #[inline]
    pub fn with_save_content(mut self, save_content: bool) -> Self {
        self.save_content = save_content;
        self
    }

    #[inline]
    pub const fn saves_content(&self) -> bool {
        self.save_content
    }

    /// Build the document and chunks for a page. Summary and embedding failures leave the
    /// corresponding fields empty.
    #[inline]
    pub async fn extract(&self, url: &str, html: &str) -> ExtractedPage {
        let parsed = parse_page(html, &self.video_markers);
        let mut document =
            ExtractedDocument::new(url, parsed.metadata, parsed.text).with_video(parsed.video_url);

        if document.content.trim().is_empty() {
            debug!("No readable content on {}", url);
        } else {
            match summarize(&document.content, self.summary_sentences) {
                Ok(sentences) => document.set_summary(&sentences),
                Err(e) => warn!("Failed to summarize {}: {:#}", url, e),
            }
        }

        if let Some(summary) = document.summary.as_deref() {
            document.summary_embedding = self.embed(summary, url, "summary").await;
        }

        let mut chunks = Vec::new();
        for text_chunk in chunk_text(&document.content, self.max_tokens) {
            let mut chunk = ContentChunk::from_text_chunk(&document, text_chunk);
            let label = format!("chunk {}", chunk.chunk_index);
            chunk.embedding = self.embed(&chunk.content, url, &label).await;
            chunks.push(chunk);
        }

        debug!(
            "Extracted {} ({} chunks, summary {})",
            url,
            chunks.len(),
            document.summary.is_some()
        );
        ExtractedPage { document, chunks }
    }

    /// Write the document, then its chunks under the new id. Nothing is written for the
    /// chunks when the document write fails.
    #[inline]
    pub async fn persist(&self, page: &ExtractedPage) -> PageOutcome {
        let document_id = match self.store.save_document(&page.document).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Skipping {} chunks of {}: document not saved ({:#})",
                    page.chunks.len(),
                    page.document.url,
                    e
                );
                return PageOutcome::DocumentSaveFailed;
            }
        };

        let mut chunks_saved = 0;
        let mut chunks_failed = 0;
        for chunk in &page.chunks {
            match self.store.save_chunk(chunk, &document_id).await {
                Ok(()) => chunks_saved += 1,
                Err(e) => {
                    warn!(
                        "Failed to save chunk {} of {}: {:#}",
                        chunk.chunk_index, chunk.url, e
                    );
                    chunks_failed += 1;
                }
            }
        }

        info!(
            "Saved {} as {} with {} chunks",
            page.document.url, document_id, chunks_saved
        );
        PageOutcome::Persisted {
            document_id,
            chunks_saved,
            chunks_failed,
        }
    }

    async fn embed(&self, text: &str, url: &str, what: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;

        match embedder.embed(text, EmbedMode::SearchDocument).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(
                    "Failed to embed {} of {} with {}: {:#}",
                    what,
                    url,
                    embedder.name(),
                    e
                );
                None
            }
        }
    }
}

#[async_trait]
impl PageHandler for ContentPipeline {
    async fn handle(&self, url: &str, html: &str) -> Result<PageOutcome> {
        let page = self.extract(url, html).await;

        if self.save_content {
            return Ok(self.persist(&page).await);
        }

        let rendered =
            serde_json::to_string_pretty(&page).context("Failed to render extracted page")?;
        println!("{}", rendered);
        Ok(PageOutcome::Printed)
    }
}
