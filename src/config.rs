//! Pipeline configuration resolved from compiled defaults and the environment.
//!
//! Resolution order (later wins): compiled defaults, then `GREENRAG_*`
//! environment variables (a `.env` file is honored via `dotenvy`, matching
//! how `OPENAI_API_KEY` reaches the process).

use std::path::PathBuf;

use tracing::warn;

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::providers::openai::{DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};

/// Fixed dimensionality of stored embeddings (`text-embedding-ada-002`).
pub const EMBEDDING_DIMENSION: usize = 1536;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory holding the two store artifacts.
    pub storage_dir: PathBuf,
    pub chunk_size: usize,
    pub dimension: usize,
    pub embed_model: String,
    pub chat_model: String,
    pub api_base: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("db"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            dimension: EMBEDDING_DIMENSION,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Resolve configuration from the environment over compiled defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("GREENRAG_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("GREENRAG_CHUNK_SIZE") {
            match raw.parse() {
                Ok(size) => config.chunk_size = size,
                Err(_) => warn!(%raw, "ignoring unparsable GREENRAG_CHUNK_SIZE"),
            }
        }
        if let Ok(model) = std::env::var("GREENRAG_EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Ok(model) = std::env::var("GREENRAG_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(base) = std::env::var("GREENRAG_API_BASE") {
            config.api_base = base;
        }
        config
    }

    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}
