//! Document ingestion: chunk, embed, classify, append, persist.
//!
//! Ingestion is staged: every chunk of the document is embedded and
//! classified into an in-memory [`EntryBatch`] before the store is touched.
//! A provider failure anywhere in the document abandons the whole batch, so
//! a failed document can never leave partial in-memory or on-disk state.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::chunking::{self, DEFAULT_CHUNK_SIZE};
use crate::document::DocumentSource;
use crate::providers::{Classifier, Embedder};
use crate::store::VectorStore;
use crate::types::{CreditType, PageText, RagError, StoredEntry};

/// Staged (embedding, entry) pairs for one document.
///
/// Built fully before any store write; applied to the store in original
/// page-then-chunk order.
#[derive(Debug, Default)]
pub struct EntryBatch {
    items: Vec<(Vec<f32>, StoredEntry)>,
}

impl EntryBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, embedding: Vec<f32>, entry: StoredEntry) {
        self.items.push((embedding, entry));
    }

    /// Consume the batch, yielding its pairs in staging order.
    pub fn into_items(self) -> Vec<(Vec<f32>, StoredEntry)> {
        self.items
    }
}

/// Summary of one completed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
}

/// Orchestrates chunking, embedding, classification, and storage for whole
/// documents.
pub struct IngestionPipeline {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    classifier: Arc<dyn Classifier>,
    chunk_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            store,
            embedder,
            classifier,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Ingest the pages of one document, then persist the store.
    ///
    /// Holds the store's writer lock for the entire call: concurrent
    /// ingestions serialize rather than interleaving their appends, and a
    /// reader reloading after this returns sees both artifacts from the same
    /// persist.
    ///
    /// Chunks are embedded and classified sequentially in page-then-chunk
    /// order, which fixes their final position in the store. Any provider
    /// failure abandons the document: the error names the offending page and
    /// chunk, and neither the store nor its artifacts change. A document that
    /// stages no chunks (zero pages, or pages without words) also leaves the
    /// store and artifacts untouched.
    pub async fn ingest(&self, pages: &[PageText]) -> Result<IngestReport, RagError> {
        let _writer = self.store.lock_writer().await;
        let run_id = Uuid::new_v4();

        let mut batch = EntryBatch::default();
        for page in pages {
            let chunks = chunking::chunk_page(page, self.chunk_size);
            info!(%run_id, page = page.number, chunks = chunks.len(), "processing page");
            for (index, chunk) in chunks.into_iter().enumerate() {
                let embedding = self
                    .embedder
                    .embed(&chunk.text)
                    .await
                    .map_err(|err| RagError::for_chunk(chunk.source_page, index, err))?;
                let label = self
                    .classifier
                    .classify(&chunk.text)
                    .await
                    .map_err(|err| RagError::for_chunk(chunk.source_page, index, err))?;
                let credit_type = CreditType::from_label(&label);
                batch.push(
                    embedding,
                    StoredEntry {
                        chunk_text: chunk.text,
                        credit_type,
                        page_number: chunk.source_page,
                    },
                );
            }
        }

        let report = IngestReport {
            pages: pages.len(),
            chunks: batch.len(),
        };
        if batch.is_empty() {
            info!(%run_id, "no chunks staged, store left untouched");
            return Ok(report);
        }

        self.store.extend(batch.into_items())?;
        self.store.persist()?;
        info!(
            %run_id,
            chunks = report.chunks,
            total = self.store.len(),
            "ingestion persisted"
        );
        Ok(report)
    }

    /// Extract a document through `source` and ingest its pages.
    pub async fn ingest_document(
        &self,
        source: &dyn DocumentSource,
        path: &Path,
    ) -> Result<IngestReport, RagError> {
        let pages = source.pages(path).await?;
        self.ingest(&pages).await
    }
}
