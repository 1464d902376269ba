//! Google Generative Language API client.
//!
//! Embeddings go through `batchEmbedContents` and answers through
//! `generateContent`. The API key is sent in the `x-goog-api-key` header so
//! it never appears in URLs, error messages, or logs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ChatModel, EmbeddingProvider, ProviderError, ProviderResult};
use crate::config::ProviderConfig;

/// Maximum number of texts accepted by one `batchEmbedContents` call.
pub const MAX_EMBED_BATCH: usize = 100;

/// Shared HTTP client holding the endpoint and credential.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from provider settings.
    ///
    /// Fails with `MissingCredential` when no API key is configured.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingCredential)?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| ProviderError::Transport {
                endpoint: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{method}", self.base_url, qualified_model(model))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> ProviderResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let transport = |source| ProviderError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .http
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Prefix bare model names with `models/`.
pub fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Pull the human-readable message out of a Google API error envelope.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: String,
        #[serde(default)]
        status: String,
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            if envelope.error.status.is_empty() {
                envelope.error.message
            } else {
                format!("{} ({})", envelope.error.message, envelope.error.status)
            }
        }
        _ => body.chars().take(200).collect(),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_batch_embed_request<'a>(
    model: &'a str,
    texts: &[&'a str],
    task_type: TaskType,
) -> BatchEmbedRequest<'a> {
    BatchEmbedRequest {
        requests: texts
            .iter()
            .map(|text| EmbedContentRequest {
                model,
                content: Content {
                    role: None,
                    parts: vec![Part { text }],
                },
                task_type,
            })
            .collect(),
    }
}

fn parse_batch_embed_response(
    response: BatchEmbedResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, String> {
    if response.embeddings.len() != expected {
        return Err(format!(
            "expected {expected} embeddings, got {}",
            response.embeddings.len()
        ));
    }

    let vectors: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();
    if vectors.iter().any(Vec::is_empty) {
        return Err("embedding with no values".to_string());
    }
    Ok(vectors)
}

fn extract_candidate_text(response: GenerateContentResponse) -> Result<String, String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => format!("prompt blocked: {reason}"),
            None => "response contained no candidates".to_string(),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ));
    }
    Ok(text)
}

// ============================================================================
// Providers
// ============================================================================

/// Embedding provider backed by `batchEmbedContents`.
#[derive(Debug, Clone)]
pub struct GeminiEmbeddings {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiEmbeddings {
    pub fn new(client: Arc<GeminiClient>, model: &str) -> Self {
        Self {
            client,
            model: qualified_model(model),
        }
    }

    async fn embed_batch(
        &self,
        texts: &[&str],
        task_type: TaskType,
    ) -> ProviderResult<Vec<Vec<f32>>> {
        let endpoint = self.client.endpoint(&self.model, "batchEmbedContents");
        let request = build_batch_embed_request(&self.model, texts, task_type);
        let response: BatchEmbedResponse = self.client.post(&endpoint, &request).await?;
        parse_batch_embed_response(response, texts.len())
            .map_err(|reason| ProviderError::Malformed { endpoint, reason })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBED_BATCH) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            vectors.extend(self.embed_batch(&refs, TaskType::RetrievalDocument).await?);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text], TaskType::RetrievalQuery).await?;
        Ok(vectors.remove(0))
    }
}

/// Chat model backed by `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiChat {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiChat {
    pub fn new(client: Arc<GeminiClient>, model: &str) -> Self {
        Self {
            client,
            model: qualified_model(model),
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> ProviderResult<String> {
        let endpoint = self.client.endpoint(&self.model, "generateContent");
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let response: GenerateContentResponse = self.client.post(&endpoint, &request).await?;
        extract_candidate_text(response)
            .map_err(|reason| ProviderError::Malformed { endpoint, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qualified_model() {
        assert_eq!(qualified_model("embedding-001"), "models/embedding-001");
        assert_eq!(qualified_model("models/gemini-1.5-pro"), "models/gemini-1.5-pro");
        assert_eq!(qualified_model("tunedModels/mine"), "tunedModels/mine");
    }

    #[test]
    fn test_batch_embed_request_shape() {
        let request = build_batch_embed_request(
            "models/embedding-001",
            &["first", "second"],
            TaskType::RetrievalDocument,
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["requests"].as_array().unwrap().len(), 2);
        assert_eq!(value["requests"][0]["model"], "models/embedding-001");
        assert_eq!(value["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(value["requests"][1]["content"]["parts"][0]["text"], "second");
        assert!(value["requests"][0]["content"].get("role").is_none());
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_parse_batch_embed_response() {
        let response: BatchEmbedResponse = serde_json::from_value(json!({
            "embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]
        }))
        .unwrap();
        let vectors = parse_batch_embed_response(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_batch_embed_response_count_mismatch() {
        let response: BatchEmbedResponse =
            serde_json::from_value(json!({"embeddings": [{"values": [0.1]}]})).unwrap();
        assert!(parse_batch_embed_response(response, 3).is_err());

        let response: BatchEmbedResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_batch_embed_response(response, 1).is_err());
    }

    #[test]
    fn test_extract_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Paris"}, {"text": " is the capital."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(
            extract_candidate_text(response).unwrap(),
            "Paris is the capital."
        );
    }

    #[test]
    fn test_extract_candidate_text_blocked() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = extract_candidate_text(response).unwrap_err();
        assert!(err.contains("SAFETY"));

        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        let err = extract_candidate_text(response).unwrap_err();
        assert!(err.contains("MAX_TOKENS"));
    }

    #[test]
    fn test_error_message_envelope() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid. (INVALID_ARGUMENT)");
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }

    #[test]
    fn test_client_requires_credential() {
        let config = ProviderConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            GeminiClient::new(&config),
            Err(ProviderError::MissingCredential)
        ));
    }
}
