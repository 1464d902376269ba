//! Write side of the vector index.
//!
//! A build embeds every chunk, writes a complete generation into a staging
//! directory and then swaps `CURRENT` to it with a rename. Any failure before
//! the swap leaves the previously committed generation untouched.
//!
//! Writers in different processes take an advisory lock on `.lock` for the
//! whole commit, so pruning never races another writer's rename and swap.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::error::{IndexError, IndexResult};
use super::manifest::{
    CHUNKS_FILE, CURRENT_FILE, FORMAT_VERSION, GENERATION_PREFIX, IndexManifest, LOCK_FILE,
    STAGING_PREFIX, VECTORS_FILE,
};
use super::store::VectorIndex;
use crate::provider::{EmbeddingProvider, ProviderError};

/// Default number of chunks sent per embedding request.
pub const DEFAULT_EMBED_BATCH: usize = 100;

/// Errors while building a new index generation.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Embedding service returned {actual} vectors for {expected} chunks")]
    VectorCountMismatch { expected: usize, actual: usize },

    #[error("Nothing to index: no chunks")]
    NoChunks,

    #[error("Index writer task failed: {0}")]
    Task(String),
}

/// Progress notifications emitted during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexProgress {
    Embedding { done: usize, total: usize },
    Writing,
    Committed { generation: String },
}

/// Writes generations and moves the `CURRENT` pointer.
#[derive(Debug, Clone)]
pub struct IndexWriter {
    root: PathBuf,
}

impl IndexWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a complete generation and make it the active one.
    ///
    /// Blocks while another writer, in this or another process, is
    /// committing. Generations older than the one being replaced are pruned
    /// afterwards.
    #[must_use = "Commit errors mean the previous index is still active"]
    pub fn commit(
        &self,
        embedding_model: &str,
        chunks: &[String],
        vectors: &[Vec<f32>],
        source_digest: &str,
    ) -> IndexResult<IndexManifest> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        if vectors.len() != chunks.len() {
            return Err(IndexError::corrupt(
                "<staging>",
                format!("{} vectors for {} chunks", vectors.len(), chunks.len()),
            ));
        }
        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(IndexError::corrupt("<staging>", "zero-length embedding"));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        fs::create_dir_all(&self.root).map_err(|e| IndexError::io(&self.root, e))?;
        // Released when the handle drops at the end of the commit
        let _lock = self.acquire_lock()?;
        self.sweep_staging();

        let previous = VectorIndex::active_generation(&self.root).unwrap_or(None);

        // Dropping the staging dir on an early return removes it
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| IndexError::io(&self.root, e))?;

        let created_at = Utc::now();
        let generation = self.next_generation_name(&created_at.format("%Y%m%dT%H%M%S%3fZ").to_string());
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            generation: generation.clone(),
            embedding_model: embedding_model.to_string(),
            dimension,
            chunk_count: chunks.len(),
            source_digest: source_digest.to_string(),
            created_at,
        };

        write_chunks(&staging.path().join(CHUNKS_FILE), chunks)?;
        write_vectors(&staging.path().join(VECTORS_FILE), vectors)?;
        manifest.save(staging.path())?;

        let generation_dir = self.root.join(&generation);
        let staged = staging.keep();
        if let Err(e) = fs::rename(&staged, &generation_dir) {
            let _ = fs::remove_dir_all(&staged);
            return Err(IndexError::io(&generation_dir, e));
        }

        self.swap_pointer(&generation)?;
        tracing::info!(
            target: "index",
            "committed generation {generation}: {} chunks, dim {dimension}",
            chunks.len()
        );

        self.prune(&generation, previous.as_deref());
        Ok(manifest)
    }

    fn acquire_lock(&self) -> IndexResult<File> {
        let path = self.root.join(LOCK_FILE);
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| IndexError::io(&path, e))?;
        file.lock().map_err(|e| IndexError::io(&path, e))?;
        Ok(file)
    }

    /// Remove staging directories left by writers that died mid-commit.
    ///
    /// Only called with the lock held, when no other staging is in progress.
    fn sweep_staging(&self) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(STAGING_PREFIX) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => tracing::info!(target: "index", "removed stale staging dir {name}"),
                Err(e) => tracing::warn!(target: "index", "failed to remove {name}: {e}"),
            }
        }
    }

    fn next_generation_name(&self, timestamp: &str) -> String {
        let mut n = 0u32;
        loop {
            let name = format!("{GENERATION_PREFIX}{timestamp}-{n:02}");
            if !self.root.join(&name).exists() {
                return name;
            }
            n += 1;
        }
    }

    fn swap_pointer(&self, generation: &str) -> IndexResult<()> {
        let pointer = self.root.join(CURRENT_FILE);
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| IndexError::io(&self.root, e))?;
        tmp.write_all(generation.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| IndexError::io(tmp.path(), e))?;
        tmp.persist(&pointer)
            .map_err(|e| IndexError::io(&pointer, e.error))?;
        Ok(())
    }

    /// Remove every generation except the current and previous one.
    fn prune(&self, current: &str, previous: Option<&str>) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(target: "index", "cannot list {}: {e}", self.root.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(GENERATION_PREFIX) || name == current || Some(name.as_str()) == previous {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => tracing::debug!(target: "index", "pruned generation {name}"),
                Err(e) => tracing::warn!(target: "index", "failed to prune {name}: {e}"),
            }
        }
    }
}

fn write_chunks(path: &Path, chunks: &[String]) -> IndexResult<()> {
    let file = File::create(path).map_err(|e| IndexError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, chunks)?;
    writer.flush().map_err(|e| IndexError::io(path, e))
}

fn write_vectors(path: &Path, vectors: &[Vec<f32>]) -> IndexResult<()> {
    let file = File::create(path).map_err(|e| IndexError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for value in vectors.iter().flatten() {
        writer
            .write_all(&value.to_le_bytes())
            .map_err(|e| IndexError::io(path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| IndexError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| IndexError::io(path, e))
}

/// Embeds chunks and commits them as a new generation.
#[derive(Clone)]
pub struct IndexBuilder {
    root: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            root: root.into(),
            embedder,
            batch_size: DEFAULT_EMBED_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn build(
        &self,
        chunks: Vec<String>,
        source_digest: String,
    ) -> Result<IndexManifest, BuildError> {
        self.build_with_progress(chunks, source_digest, |_| {}).await
    }

    /// Embed `chunks` in batches and commit them, reporting progress.
    pub async fn build_with_progress<F>(
        &self,
        chunks: Vec<String>,
        source_digest: String,
        mut on_progress: F,
    ) -> Result<IndexManifest, BuildError>
    where
        F: FnMut(IndexProgress) + Send,
    {
        if chunks.is_empty() {
            return Err(BuildError::NoChunks);
        }

        let total = chunks.len();
        let mut vectors = Vec::with_capacity(total);
        on_progress(IndexProgress::Embedding { done: 0, total });

        for batch in chunks.chunks(self.batch_size) {
            let embedded = self.embedder.embed_documents(batch).await?;
            if embedded.len() != batch.len() {
                return Err(BuildError::VectorCountMismatch {
                    expected: batch.len(),
                    actual: embedded.len(),
                });
            }
            vectors.extend(embedded);
            on_progress(IndexProgress::Embedding {
                done: vectors.len(),
                total,
            });
        }

        on_progress(IndexProgress::Writing);
        let writer = IndexWriter::new(self.root.clone());
        let model = self.embedder.model_id().to_string();
        let manifest = tokio::task::spawn_blocking(move || {
            writer.commit(&model, &chunks, &vectors, &source_digest)
        })
        .await
        .map_err(|e| BuildError::Task(e.to_string()))??;

        on_progress(IndexProgress::Committed {
            generation: manifest.generation.clone(),
        });
        Ok(manifest)
    }
}
