//! Collaborator seams: embedding, classification, and answer generation.
//!
//! The pipeline only depends on these traits; the production implementation
//! ([`openai::OpenAiClient`]) talks to the OpenAI HTTP API, while
//! [`mock`] provides deterministic in-process collaborators for tests and
//! offline runs.

pub mod mock;
pub mod openai;

use async_trait::async_trait;

use crate::types::{CreditType, RagError};

/// The retrieved chunk and its metadata, supplied to the answer generator as
/// context for composing a grounded answer.
#[derive(Debug, Clone)]
pub struct Grounding {
    pub text: String,
    pub credit_type: CreditType,
    /// Squared Euclidean distance of the chunk from the query embedding.
    pub distance: f32,
    pub page: u32,
}

/// Maps text to a fixed-dimension dense embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. The returned vector has [`Embedder::dimension`]
    /// values. Fails with [`RagError::Embedding`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Dimensionality of the vectors this embedder produces.
    fn dimension(&self) -> usize;
}

/// Maps chunk text to a credit-category label.
///
/// The label is returned raw; callers normalize it with
/// [`CreditType::from_label`], which maps anything unrecognized to
/// [`CreditType::General`].
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Fails with [`RagError::Classification`].
    async fn classify(&self, text: &str) -> Result<String, RagError>;
}

/// Composes a grounded answer to a user question.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Fails with [`RagError::AnswerGeneration`].
    async fn compose(&self, user_query: &str, grounding: &Grounding) -> Result<String, RagError>;
}
