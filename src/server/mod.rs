//! HTTP front end: the question page and its JSON API.
//!
//! The page is stateless; every action is one request against the shared
//! [`Assistant`], and the on-disk index is the only state between requests.

mod page;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::documents::UploadedDocument;
use crate::index::{IndexError, IndexManifest};
use crate::provider::ProviderError;
use crate::qa::{AskError, Assistant, ProcessError, ProcessReport};

/// Error body returned by every API endpoint: `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(target: "http", "[http] {}: {}", self.kind, self.message);
        }
        let body = json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<AskError> for ApiError {
    fn from(error: AskError) -> Self {
        let status = match &error {
            AskError::EmptyQuestion => StatusCode::BAD_REQUEST,
            AskError::IndexMissing { .. } | AskError::ModelMismatch { .. } => StatusCode::CONFLICT,
            AskError::Remote(_) | AskError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AskError::Index(_) | AskError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, error.kind(), error.to_string())
    }
}

impl From<ProcessError> for ApiError {
    fn from(error: ProcessError) -> Self {
        let status = match &error {
            ProcessError::NothingToIndex { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProcessError::Embedding(ProviderError::MissingCredential) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProcessError::Embedding(_) => StatusCode::BAD_GATEWAY,
            ProcessError::InvalidChunking(_) | ProcessError::Index(_) | ProcessError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, error.kind(), error.to_string())
    }
}

impl From<IndexError> for ApiError {
    fn from(error: IndexError) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "index_error",
            error.to_string(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
    refusal: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    indexed: bool,
    embedding_model: String,
    chat_model: String,
    manifest: Option<IndexManifest>,
}

/// Build the application router around a shared assistant.
pub fn router(assistant: Arc<Assistant>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/api/process", post(process))
        .route("/api/ask", post(ask))
        .route("/api/status", get(status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(assistant)
}

async fn index_page() -> Html<&'static str> {
    Html(page::INDEX_HTML)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn process(
    State(assistant): State<Arc<Assistant>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessReport>, ApiError> {
    let upload_error = |e: axum::extract::multipart::MultipartError| {
        ApiError::new(e.status(), "bad_upload", e.body_text())
    };

    let mut documents = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;
        documents.push(UploadedDocument::new(filename, bytes.to_vec()));
    }

    if documents.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "no_files",
            "Upload at least one PDF file",
        ));
    }

    crate::log_event!("http", "process", "{} file(s)", documents.len());
    let report = assistant.process(documents).await?;
    crate::debug_event!("http", "processed", "{} chunks", report.chunks);
    Ok(Json(report))
}

async fn ask(
    State(assistant): State<Arc<Assistant>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    crate::debug_event!("http", "ask", "{} chars", request.question.len());
    let answer = assistant.ask(&request.question).await?;
    Ok(Json(AskResponse {
        answer: answer.text,
        refusal: answer.refusal,
    }))
}

async fn status(State(assistant): State<Arc<Assistant>>) -> Result<Json<StatusResponse>, ApiError> {
    let manifest = assistant.status()?;
    Ok(Json(StatusResponse {
        indexed: manifest.is_some(),
        embedding_model: assistant.embedding_model().to_string(),
        chat_model: assistant.chat_model().to_string(),
        manifest,
    }))
}

/// Run the page until ctrl-c.
pub async fn serve(settings: Settings, bind: String) -> anyhow::Result<()> {
    use console::style;

    let assistant = Arc::new(Assistant::from_settings(&settings)?);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let app = router(assistant, settings.server.max_upload_bytes).layer(cors);

    crate::log_event!("http", "starting", "page on {bind}");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    eprintln!(
        "{} listening on {}",
        style("pdfchat").bold(),
        style(format!("http://{bind}")).cyan()
    );
    eprintln!("Health check: http://{bind}/health");
    eprintln!("Press Ctrl+C to stop the server");

    // Create cancellation token for coordinated shutdown
    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => eprintln!("Shutting down HTTP server..."),
            Err(e) => tracing::error!(target: "http", "[http] cannot listen for ctrl-c: {e}"),
        }
        signal_ct.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(ct.cancelled_owned())
        .await?;

    eprintln!("HTTP server shut down gracefully");
    Ok(())
}
