//! Deterministic in-process collaborators for tests and offline runs.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{AnswerGenerator, Classifier, Embedder, Grounding};
use crate::types::RagError;

/// Embedder producing a deterministic pseudo-random vector per text.
///
/// The same text always maps to the same vector and different texts map to
/// different vectors, which is enough for retrieval tests: probing with a
/// stored chunk's exact text finds that chunk at distance zero.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        // Seed must be odd so the xorshift sequence never collapses to zero.
        let mut state = hasher.finish() | 1;
        let values = (0..self.dimension)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect();
        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that succeeds a fixed number of times, then fails every call.
///
/// Used to exercise the abandon-whole-document path of ingestion.
pub struct FailingEmbedder {
    inner: MockEmbedder,
    successes: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize, successes: usize) -> Self {
        Self {
            inner: MockEmbedder::new(dimension),
            successes,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.successes {
            return Err(RagError::Embedding("mock embedder exhausted".to_string()));
        }
        self.inner.embed(text).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Classifier returning the same label for every chunk.
pub struct MockClassifier {
    label: String,
}

impl MockClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<String, RagError> {
        Ok(self.label.clone())
    }
}

/// Classifier that fails every call.
pub struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<String, RagError> {
        Err(RagError::Classification(
            "mock classifier unavailable".to_string(),
        ))
    }
}

/// Answer generator that echoes the question and grounding page.
pub struct MockAnswerGenerator;

#[async_trait]
impl AnswerGenerator for MockAnswerGenerator {
    async fn compose(&self, user_query: &str, grounding: &Grounding) -> Result<String, RagError> {
        Ok(format!(
            "Answer to '{user_query}' grounded on page {}",
            grounding.page
        ))
    }
}
