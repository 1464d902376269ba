#![cfg(feature = "http-server")]
//! JSON API driven through the router without binding a socket.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pdfchat::server::router;
use pdfchat::testing::{ExtractiveChat, FailingChat, HashingEmbedder, pdf_with_pages};
use pdfchat::{Assistant, ChatModel, Settings};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "pdfchat-test-boundary";

fn app_with_chat(dir: &TempDir, chat: Arc<dyn ChatModel>, max_upload_bytes: usize) -> Router {
    let mut settings = Settings::default();
    settings.index_path = dir.path().join("faiss_index");
    let assistant = Assistant::new(&settings, Arc::new(HashingEmbedder::new(64)), chat);
    router(Arc::new(assistant), max_upload_bytes)
}

fn app(dir: &TempDir) -> Router {
    app_with_chat(dir, Arc::new(ExtractiveChat::new()), 10 * 1024 * 1024)
}

fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(files: &[(&str, &[u8])]) -> Request<Body> {
    Request::post("/api/process")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap()
}

fn ask_request(question: &str) -> Request<Body> {
    Request::post("/api/ask")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "question": question }).to_string(),
        ))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_upload_then_ask() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let pdf = pdf_with_pages(&[&["The capital of France is Paris."]]).unwrap();

    let response = app
        .clone()
        .oneshot(upload_request(&[("france.pdf", pdf.as_slice())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["documents_uploaded"], 1);
    assert_eq!(report["chunks"], 1);
    assert_eq!(report["dimension"], 64);

    let response = app
        .clone()
        .oneshot(ask_request("What is the capital of France?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["answer"].as_str().unwrap().contains("Paris"));
    assert_eq!(body["refusal"], false);

    let response = app
        .clone()
        .oneshot(ask_request("What is the capital of Germany?"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["answer"], "answer is not available in the context");
    assert_eq!(body["refusal"], true);

    let response = app
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = json_body(response).await;
    assert_eq!(status["indexed"], true);
    assert_eq!(status["manifest"]["chunk_count"], 1);
    assert_eq!(status["manifest"]["embedding_model"], "test/hashing-embedder");
}

#[tokio::test]
async fn test_upload_without_text_is_unprocessable() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(upload_request(&[("notes.pdf", b"plain text".as_slice())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "nothing_to_index");
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir).oneshot(upload_request(&[])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "no_files");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with_chat(&dir, Arc::new(ExtractiveChat::new()), 256);
    let big = vec![b'x'; 4096];

    let response = app
        .oneshot(upload_request(&[("big.pdf", big.as_slice())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_remote_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let app = app_with_chat(&dir, Arc::new(FailingChat::unavailable()), 10 * 1024 * 1024);
    let pdf = pdf_with_pages(&[&["Some indexed text."]]).unwrap();

    let response = app
        .clone()
        .oneshot(upload_request(&[("a.pdf", pdf.as_slice())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(ask_request("What text?")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "remote_service");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("503")
    );
}
