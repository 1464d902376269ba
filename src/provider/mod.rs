//! Remote model providers.
//!
//! The embedding service and the chat-completion service sit behind two
//! traits so the pipeline never depends on a concrete vendor. The Gemini
//! implementation talks to the Google Generative Language REST API.

mod error;
pub mod gemini;

pub use error::{ProviderError, ProviderResult};
pub use gemini::{GeminiChat, GeminiClient, GeminiEmbeddings};

use async_trait::async_trait;

/// A service that turns text into fixed-dimension vectors.
///
/// Document and query embeddings must come from the same model for their
/// similarity to mean anything; `model_id` is persisted with the index and
/// checked when it is opened.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the embedding model, e.g. `models/embedding-001`.
    fn model_id(&self) -> &str;

    /// Embed a batch of documents, one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> ProviderResult<Vec<f32>>;
}

/// A hosted chat model that completes a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier of the chat model, e.g. `models/gemini-1.5-pro`.
    fn model_id(&self) -> &str;

    /// Generate a reply for `prompt` at the given sampling temperature.
    async fn complete(&self, prompt: &str, temperature: f32) -> ProviderResult<String>;
}
