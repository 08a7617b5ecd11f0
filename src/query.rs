//! Query-time retrieval and grounded answer composition.

use std::sync::Arc;

use tracing::debug;

use crate::providers::{AnswerGenerator, Embedder, Grounding};
use crate::store::{StoreError, VectorStore};
use crate::types::{RagError, StoredEntry};

/// The result of answering one question.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The nearest stored chunk the answer was grounded on.
    pub entry: StoredEntry,
    /// Squared Euclidean distance of that chunk from the query embedding.
    pub distance: f32,
    pub answer: String,
}

/// Answers questions from the nearest stored chunk.
///
/// Stateless across calls apart from the shared store snapshot it reads;
/// conversation history belongs to callers.
pub struct QueryService {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn AnswerGenerator>,
}

impl QueryService {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        answerer: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            store,
            embedder,
            answerer,
        }
    }

    /// Embed the question, retrieve the nearest chunk, and compose a grounded
    /// answer.
    ///
    /// Surfaces [`StoreError::EmptyIndex`] when nothing has been ingested and
    /// [`RagError::AnswerGeneration`] when composition fails; neither is
    /// retried.
    pub async fn answer(&self, user_query: &str) -> Result<QueryOutcome, RagError> {
        let embedding = self.embedder.embed(user_query).await?;
        let hit = self
            .store
            .search(&embedding, 1)?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyIndex)?;
        debug!(
            distance = hit.distance,
            page = hit.entry.page_number,
            credit_type = %hit.entry.credit_type,
            "top chunk selected"
        );

        let grounding = Grounding {
            text: hit.entry.chunk_text.clone(),
            credit_type: hit.entry.credit_type,
            distance: hit.distance,
            page: hit.entry.page_number,
        };
        let answer = self.answerer.compose(user_query, &grounding).await?;

        Ok(QueryOutcome {
            entry: hit.entry,
            distance: hit.distance,
            answer,
        })
    }
}
