//! HTTP-level tests for the OpenAI client against a local mock server.

use httpmock::prelude::*;
use serde_json::json;

use greenrag::providers::openai::OpenAiClient;
use greenrag::providers::{AnswerGenerator, Classifier, Embedder, Grounding};
use greenrag::{CreditType, RagError};

fn client_for(server: &MockServer, dimension: usize) -> OpenAiClient {
    OpenAiClient::new("test-key".to_string(), dimension)
        .with_base_url(format!("http://{}", server.address()))
}

#[tokio::test]
async fn embed_sends_the_model_and_parses_the_vector() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/embeddings")
            .header("authorization", "Bearer test-key")
            .json_body_partial(r#"{"model": "text-embedding-ada-002", "input": ["hello"]}"#);
        then.status(200).json_body(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
        }));
    });

    let client = client_for(&server, 3);
    let embedding = client.embed("hello").await.unwrap();
    mock.assert();
    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn embed_rejects_a_vector_of_the_wrong_dimension() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [{"embedding": [0.1, 0.2], "index": 0}]
        }));
    });

    let client = client_for(&server, 3);
    let err = client.embed("hello").await.unwrap_err();
    match err {
        RagError::Embedding(message) => assert!(message.contains("dimension mismatch")),
        other => panic!("expected embedding failure, got {other}"),
    }
}

#[tokio::test]
async fn embed_surfaces_api_errors_with_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(500).body("upstream exploded");
    });

    let client = client_for(&server, 3);
    let err = client.embed("hello").await.unwrap_err();
    match err {
        RagError::Embedding(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected embedding failure, got {other}"),
    }
}

#[tokio::test]
async fn classify_returns_the_raw_label_for_normalization() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(r#"{"model": "gpt-4o-mini"}"#);
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "Energy Efficiency\n"}}]
        }));
    });

    let client = client_for(&server, 3);
    let label = client.classify("install LED lighting").await.unwrap();
    mock.assert();
    assert_eq!(label, "Energy Efficiency");
    assert_eq!(
        CreditType::from_label(&label),
        CreditType::EnergyEfficiency
    );
}

#[tokio::test]
async fn compose_sends_the_grounding_turns_and_trims_the_answer() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(r#"{"max_tokens": 500, "temperature": 0.7}"#);
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Grounded answer.  "}}]
        }));
    });

    let client = client_for(&server, 3);
    let grounding = Grounding {
        text: "Rainwater harvesting earns up to four points.".to_string(),
        credit_type: CreditType::WaterConservation,
        distance: 0.42,
        page: 12,
    };
    let answer = client
        .compose("How many points for rainwater harvesting?", &grounding)
        .await
        .unwrap();
    mock.assert();
    assert_eq!(answer, "Grounded answer.");
}

#[tokio::test]
async fn compose_failure_is_an_answer_generation_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429).body("rate limited");
    });

    let client = client_for(&server, 3);
    let grounding = Grounding {
        text: "chunk".to_string(),
        credit_type: CreditType::General,
        distance: 1.0,
        page: 1,
    };
    let err = client.compose("question", &grounding).await.unwrap_err();
    assert!(matches!(err, RagError::AnswerGeneration(_)));
}
