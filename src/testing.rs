//! Offline stand-ins for the remote services, and an in-memory PDF writer.
//!
//! Used by unit and integration tests so the full pipeline runs without a
//! network or API key.

use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::provider::{ChatModel, EmbeddingProvider, ProviderError, ProviderResult};
use crate::qa::REFUSAL_ANSWER;

/// Bag-of-words embedder: each lowercase word is hashed into one of
/// `dimension` buckets. Texts sharing words get similar vectors, and equal
/// texts get equal vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model: "test/hashing-embedder".to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in words(text) {
            let digest = Sha256::digest(word.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let slot = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> ProviderResult<Vec<f32>> {
        Ok(self.embed(text))
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Chat model that answers only from the prompt's context.
///
/// Capitalized words of the question (after the first) are keywords; the
/// reply is every context sentence containing one, or the refusal answer
/// when none does.
#[derive(Debug, Default)]
pub struct ExtractiveChat {
    last_prompt: Mutex<Option<String>>,
    last_temperature: Mutex<Option<f32>>,
}

impl ExtractiveChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    pub fn last_temperature(&self) -> Option<f32> {
        self.last_temperature.lock().ok().and_then(|t| *t)
    }

    fn answer(prompt: &str) -> String {
        let context = section(prompt, "Context:\n", "\n\nQuestion:\n");
        let question = section(prompt, "Question:\n", "\n\nAnswer:");

        let keywords: Vec<String> = question
            .split_whitespace()
            .skip(1)
            .filter(|w| w.starts_with(char::is_uppercase))
            .flat_map(words)
            .collect();
        if keywords.is_empty() {
            return REFUSAL_ANSWER.to_string();
        }

        let sentences: Vec<&str> = context
            .split(['.', '?', '!', '\n'])
            .map(str::trim)
            .filter(|s| {
                let in_sentence: Vec<String> = words(s).collect();
                keywords.iter().any(|k| in_sentence.contains(k))
            })
            .collect();

        if sentences.is_empty() {
            REFUSAL_ANSWER.to_string()
        } else {
            format!("{}.", sentences.join(". "))
        }
    }
}

fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let Some(from) = text.find(start).map(|i| i + start.len()) else {
        return "";
    };
    let rest = &text[from..];
    rest.find(end).map_or(rest, |to| &rest[..to])
}

#[async_trait]
impl ChatModel for ExtractiveChat {
    fn model_id(&self) -> &str {
        "test/extractive-chat"
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> ProviderResult<String> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if let Ok(mut last) = self.last_temperature.lock() {
            *last = Some(temperature);
        }
        Ok(Self::answer(prompt))
    }
}

/// Embedder whose every call fails with a service error.
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder {
    model: Option<String>,
}

impl FailingEmbedder {
    /// Fail while reporting the same model id as `other`.
    pub fn impersonating(other: &dyn EmbeddingProvider) -> Self {
        Self {
            model: Some(other.model_id().to_string()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or("test/failing-embedder")
    }

    async fn embed_documents(&self, _texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Err(unavailable("embed_documents"))
    }

    async fn embed_query(&self, _text: &str) -> ProviderResult<Vec<f32>> {
        Err(unavailable("embed_query"))
    }
}

/// Chat model that always fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingChat {
    malformed: bool,
}

impl FailingChat {
    /// Fails as if the service returned HTTP 503.
    pub fn unavailable() -> Self {
        Self { malformed: false }
    }

    /// Fails as if the service returned no candidate text.
    pub fn malformed() -> Self {
        Self { malformed: true }
    }
}

#[async_trait]
impl ChatModel for FailingChat {
    fn model_id(&self) -> &str {
        "test/failing-chat"
    }

    async fn complete(&self, _prompt: &str, _temperature: f32) -> ProviderResult<String> {
        if self.malformed {
            Err(ProviderError::Malformed {
                endpoint: "fake://complete".to_string(),
                reason: "response contained no candidates".to_string(),
            })
        } else {
            Err(unavailable("complete"))
        }
    }
}

fn unavailable(method: &str) -> ProviderError {
    ProviderError::Status {
        endpoint: format!("fake://{method}"),
        status: 503,
        message: "service unavailable".to_string(),
    }
}

/// Build an uncompressed PDF with one page per entry of `pages`, each page
/// showing its lines in Courier.
pub fn pdf_with_pages(pages: &[&[&str]]) -> lopdf::Result<Vec<u8>> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in lines.iter() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
