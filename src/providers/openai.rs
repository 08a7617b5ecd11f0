//! OpenAI-backed implementations of the collaborator traits.
//!
//! One [`OpenAiClient`] serves all three seams: embeddings through
//! `/v1/embeddings` and both classification and answer composition through
//! `/v1/chat/completions`. The base URL is overridable so tests can point the
//! client at a local mock server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{AnswerGenerator, Classifier, Embedder, Grounding};
use crate::types::RagError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    embed_model: String,
    chat_model: String,
    dimension: usize,
}

impl OpenAiClient {
    pub fn new(api_key: String, dimension: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_models(
        mut self,
        embed_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        self.embed_model = embed_model.into();
        self.chat_model = chat_model.into();
        self
    }

    /// POST a chat-completions body and extract the first choice's content.
    ///
    /// Errors come back as plain strings so each caller can wrap them in its
    /// own failure kind.
    async fn chat_completion(&self, body: serde_json::Value) -> Result<String, String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(%url, "openai chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{status}: {body}"));
        }

        let value: serde_json::Value = response.json().await.map_err(|err| err.to_string())?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| "missing choices[0].message.content".to_string())
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        debug!(%url, "openai embedding request");

        let request = EmbedRequest {
            model: self.embed_model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("{status}: {body}")));
        }

        let mut parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        parsed.data.sort_by_key(|item| item.index);

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| RagError::Embedding("response carried no embedding".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Classifier for OpenAiClient {
    async fn classify(&self, text: &str) -> Result<String, RagError> {
        let prompt = format!(
            "You are a green building expert. The following text is part of a green building \
             certification document. Classify the text into one of the following categories:\n\
             1. Energy Efficiency\n\
             2. Water Conservation\n\
             3. Sustainable Materials\n\
             4. Indoor Environmental Quality\n\
             5. General (if it doesn't fit in any of the above)\n\n\
             Here is the text: {text}\n\n\
             Respond with only the category name."
        );

        let body = json!({
            "model": self.chat_model,
            "messages": [
                {"role": "system", "content": "You are a classification assistant."},
                {"role": "user", "content": prompt},
            ],
        });

        self.chat_completion(body)
            .await
            .map_err(RagError::Classification)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiClient {
    async fn compose(&self, user_query: &str, grounding: &Grounding) -> Result<String, RagError> {
        let context = format!(
            "Relevant Chunk (Credit Type: {}, Distance: {}, Page: {}):\n{}",
            grounding.credit_type, grounding.distance, grounding.page, grounding.text
        );

        let body = json!({
            "model": self.chat_model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert in green building practices and standards.",
                },
                {"role": "user", "content": format!("The user asked: '{user_query}'.")},
                {"role": "assistant", "content": context},
                {
                    "role": "user",
                    "content": "Now, based on the information above, please provide the best answer.",
                },
            ],
            "max_tokens": 500,
            "temperature": 0.7,
        });

        self.chat_completion(body)
            .await
            .map_err(RagError::AnswerGeneration)
    }
}
