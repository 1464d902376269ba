//! The question-answering pipeline.
//!
//! `process` runs extraction, chunking and indexing for one upload batch.
//! `ask` runs retrieval and answer synthesis against whatever generation is
//! current when it starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::error::{AskError, ProcessError};
use super::prompt::{is_refusal, render_prompt};
use crate::config::Settings;
use crate::documents::{Chunker, ChunkingConfig, RecursiveChunker, UploadedDocument, extract_text};
use crate::index::{
    IndexBuilder, IndexError, IndexManifest, IndexProgress, ScoredChunk, VectorIndex,
    source_digest,
};
use crate::provider::{
    ChatModel, EmbeddingProvider, GeminiChat, GeminiClient, GeminiEmbeddings, ProviderResult,
};

/// Outcome of a successful processing action.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub documents_uploaded: usize,
    pub documents_read: usize,
    pub pages_read: usize,
    pub characters: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub generation: String,
}

/// A synthesized answer.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,

    /// True when the model replied with the refusal answer
    pub refusal: bool,

    /// Retrieved chunks the answer was grounded on, best first
    #[serde(skip)]
    pub context: Vec<ScoredChunk>,
}

/// Runs the process and ask actions against one index root.
pub struct Assistant {
    index_path: PathBuf,
    chunking: ChunkingConfig,
    top_k: usize,
    temperature: f32,
    embed_batch_size: usize,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    process_lock: Mutex<()>,
}

impl Assistant {
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            index_path: settings.index_path.clone(),
            chunking: settings.documents.clone(),
            top_k: settings.retrieval.top_k,
            temperature: settings.provider.temperature,
            embed_batch_size: settings.provider.embed_batch_size,
            embedder,
            chat,
            process_lock: Mutex::new(()),
        }
    }

    /// Build an assistant backed by the Gemini services in `settings`.
    pub fn from_settings(settings: &Settings) -> ProviderResult<Self> {
        let client = Arc::new(GeminiClient::new(&settings.provider)?);
        let embedder = Arc::new(GeminiEmbeddings::new(
            Arc::clone(&client),
            &settings.provider.embedding_model,
        ));
        let chat = Arc::new(GeminiChat::new(client, &settings.provider.chat_model));
        Ok(Self::new(settings, embedder, chat))
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn chat_model(&self) -> &str {
        self.chat.model_id()
    }

    pub async fn process(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> Result<ProcessReport, ProcessError> {
        self.process_with_progress(documents, |_| {}).await
    }

    /// Replace the index with the contents of `documents`.
    ///
    /// Concurrent calls are serialized. On error the previous index stays
    /// active.
    pub async fn process_with_progress<F>(
        &self,
        documents: Vec<UploadedDocument>,
        on_progress: F,
    ) -> Result<ProcessReport, ProcessError>
    where
        F: FnMut(IndexProgress) + Send,
    {
        let _guard = self.process_lock.lock().await;

        let chunking = self.chunking.clone();
        chunking.validate().map_err(ProcessError::InvalidChunking)?;

        let uploaded = documents.len();
        tracing::info!(target: "process", "processing {uploaded} uploaded file(s)");

        let (extracted, chunks) = tokio::task::spawn_blocking(move || {
            let extracted = extract_text(&documents);
            let chunks = RecursiveChunker.chunk(&extracted.text, &chunking);
            (extracted, chunks)
        })
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))?;

        if extracted.is_blank() || chunks.is_empty() {
            return Err(ProcessError::NothingToIndex { uploaded });
        }

        tracing::debug!(
            target: "process",
            "extracted {} chars from {} document(s), {} chunk(s)",
            extracted.char_count(),
            extracted.documents_read,
            chunks.len()
        );

        let digest = source_digest(&extracted.text);
        let texts: Vec<String> = chunks.into_iter().map(|chunk| chunk.content).collect();
        let chunk_count = texts.len();

        let manifest = IndexBuilder::new(&self.index_path, Arc::clone(&self.embedder))
            .with_batch_size(self.embed_batch_size)
            .build_with_progress(texts, digest, on_progress)
            .await?;

        tracing::info!(
            target: "process",
            "indexed {chunk_count} chunk(s) into {}",
            manifest.generation
        );

        Ok(ProcessReport {
            documents_uploaded: uploaded,
            documents_read: extracted.documents_read,
            pages_read: extracted.pages_read,
            characters: extracted.char_count(),
            chunks: chunk_count,
            dimension: manifest.dimension,
            embedding_model: manifest.embedding_model,
            generation: manifest.generation,
        })
    }

    /// Answer `question` from the current index.
    pub async fn ask(&self, question: &str) -> Result<Answer, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        let root = self.index_path.clone();
        let model = self.embedder.model_id().to_string();
        let index = tokio::task::spawn_blocking(move || VectorIndex::open(&root, &model))
            .await
            .map_err(|e| AskError::Task(e.to_string()))??;

        let query = self.embedder.embed_query(question).await?;
        let context = index.search(&query, self.top_k)?;
        tracing::debug!(
            target: "ask",
            "retrieved {} chunk(s) from {}",
            context.len(),
            index.manifest().generation
        );

        let prompt = render_prompt(
            &context.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            question,
        );
        let reply = self.chat.complete(&prompt, self.temperature).await?;
        let text = reply.trim().to_string();

        Ok(Answer {
            refusal: is_refusal(&text),
            text,
            context,
        })
    }

    /// Manifest of the active generation, or `None` before the first build.
    pub fn status(&self) -> Result<Option<IndexManifest>, IndexError> {
        match VectorIndex::current_manifest(&self.index_path) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(IndexError::NotBuilt { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
