#![cfg(feature = "http-server")]
//! Gemini client against a local mock of the Generative Language API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pdfchat::config::ProviderConfig;
use pdfchat::provider::{
    ChatModel, EmbeddingProvider, GeminiChat, GeminiClient, GeminiEmbeddings, ProviderError,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn handle(
    State(recorded): State<Recorded>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    recorded
        .requests
        .lock()
        .unwrap()
        .push((call.clone(), key.clone(), body.clone()));

    if key.as_deref() != Some("test-key") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}})),
        );
    }

    if call.ends_with(":batchEmbedContents") {
        let embeddings: Vec<Value> = body["requests"]
            .as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, _)| json!({"values": [i as f32, 1.0, 0.5]}))
            .collect();
        (StatusCode::OK, Json(json!({"embeddings": embeddings})))
    } else if call == "gemini-1.5-pro:generateContent" {
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Paris."}]},
                    "finishReason": "STOP"
                }]
            })),
        )
    } else {
        // A model that never produces a candidate
        (StatusCode::OK, Json(json!({"candidates": []})))
    }
}

async fn mock_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1beta/models/{call}", post(handle))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1beta"), recorded)
}

fn client(base_url: &str, key: &str) -> Arc<GeminiClient> {
    let config = ProviderConfig {
        api_key: Some(key.to_string()),
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..Default::default()
    };
    Arc::new(GeminiClient::new(&config).unwrap())
}

#[tokio::test]
async fn test_embeddings_are_batched_with_task_types() {
    let (base_url, recorded) = mock_server().await;
    let embeddings = GeminiEmbeddings::new(client(&base_url, "test-key"), "embedding-001");
    assert_eq!(embeddings.model_id(), "models/embedding-001");

    let texts: Vec<String> = (0..150).map(|i| format!("chunk {i}")).collect();
    let vectors = embeddings.embed_documents(&texts).await.unwrap();
    assert_eq!(vectors.len(), 150);
    assert_eq!(vectors[0].len(), 3);

    let query = embeddings.embed_query("a question").await.unwrap();
    assert_eq!(query, vec![0.0, 1.0, 0.5]);

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].0, "embedding-001:batchEmbedContents");
    assert_eq!(requests[0].1.as_deref(), Some("test-key"));
    assert_eq!(requests[0].2["requests"].as_array().unwrap().len(), 100);
    assert_eq!(requests[1].2["requests"].as_array().unwrap().len(), 50);
    assert_eq!(requests[0].2["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
    assert_eq!(requests[2].2["requests"][0]["taskType"], "RETRIEVAL_QUERY");
    assert_eq!(requests[2].2["requests"][0]["model"], "models/embedding-001");
}

#[tokio::test]
async fn test_chat_sends_temperature_and_reads_candidate() {
    let (base_url, recorded) = mock_server().await;
    let chat = GeminiChat::new(client(&base_url, "test-key"), "gemini-1.5-pro");

    let reply = chat.complete("What is the capital?", 0.3).await.unwrap();
    assert_eq!(reply, "Paris.");

    let requests = recorded.requests.lock().unwrap();
    let body = &requests[0].2;
    assert_eq!(body["contents"][0]["parts"][0]["text"], "What is the capital?");
    let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let (base_url, _) = mock_server().await;
    let chat = GeminiChat::new(client(&base_url, "wrong-key"), "gemini-1.5-pro");

    match chat.complete("hi", 0.3).await {
        Err(ProviderError::Status {
            status, message, ..
        }) => {
            assert_eq!(status, 400);
            assert!(message.contains("API key not valid."));
            assert!(!message.contains("wrong-key"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_candidate_is_malformed() {
    let (base_url, _) = mock_server().await;
    let chat = GeminiChat::new(client(&base_url, "test-key"), "other-model");

    let err = chat.complete("hi", 0.3).await.unwrap_err();
    assert!(err.is_malformed(), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let chat = GeminiChat::new(
        client(&format!("http://{addr}/v1beta"), "test-key"),
        "gemini-1.5-pro",
    );
    assert!(matches!(
        chat.complete("hi", 0.3).await,
        Err(ProviderError::Transport { .. })
    ));
}
