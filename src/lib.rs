//! Retrieval-augmented question answering over green-building certification
//! documents.
//!
//! ```text
//! PDF ──► document::PdfSource ──► (page_number, text) pages
//!
//! pages ──► chunking::chunk_page ──► word-window chunks
//!                      │
//!                      ├─► providers::Embedder   ──► Vec<f32>
//!                      └─► providers::Classifier ──► CreditType
//!                                     │
//! staged batch ──► store::VectorStore ──► index.bin + entries.json
//!
//! question ──► providers::Embedder ──► VectorStore::search ──► Grounding
//!                                                  │
//!                            providers::AnswerGenerator ──► answer
//! ```
//!
//! Ingestion ([`IngestionPipeline`]) and querying ([`QueryService`]) share
//! one [`VectorStore`]. The store keeps its vector index and metadata
//! sequence in lock-step behind a single abstraction and persists them as a
//! flat two-artifact pair; ingestion holds the store's writer lock across its
//! whole stage-apply-persist cycle, so readers only ever observe pre- or
//! post-ingest state.

pub mod chunking;
pub mod config;
pub mod document;
pub mod ingest;
pub mod providers;
pub mod query;
pub mod store;
pub mod types;

pub use config::PipelineConfig;
pub use ingest::{EntryBatch, IngestReport, IngestionPipeline};
pub use providers::{AnswerGenerator, Classifier, Embedder, Grounding};
pub use query::{QueryOutcome, QueryService};
pub use store::{SearchHit, StoreError, VectorStore};
pub use types::{Chunk, CreditType, PageText, RagError, StoredEntry};
