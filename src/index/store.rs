//! Read side of the vector index.
//!
//! A `VectorIndex` is a snapshot of one committed generation. `CURRENT` is
//! resolved exactly once in `open`, so a concurrent rebuild never changes
//! what an open index returns.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::Serialize;

use super::error::{IndexError, IndexResult};
use super::manifest::{
    CHUNKS_FILE, CURRENT_FILE, FORMAT_VERSION, IndexManifest, VECTORS_FILE,
};

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    /// Position of the chunk in the index
    pub position: usize,
    pub score: f32,
    pub text: String,
}

/// Memory-mapped view of one index generation.
#[derive(Debug)]
pub struct VectorIndex {
    generation_dir: PathBuf,
    manifest: IndexManifest,
    chunks: Vec<String>,
    vectors: Mmap,
}

impl VectorIndex {
    /// Check whether an index has been committed under `root`.
    pub fn exists(root: &Path) -> bool {
        root.join(CURRENT_FILE).is_file()
    }

    /// Name of the active generation, if any.
    pub fn active_generation(root: &Path) -> IndexResult<Option<String>> {
        let pointer = root.join(CURRENT_FILE);
        match fs::read_to_string(&pointer) {
            Ok(content) => {
                let name = content.trim();
                if name.is_empty() {
                    Err(IndexError::corrupt(CURRENT_FILE, "pointer file is empty"))
                } else {
                    Ok(Some(name.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IndexError::io(pointer, e)),
        }
    }

    /// Manifest of the active generation without loading any vectors.
    pub fn current_manifest(root: &Path) -> IndexResult<IndexManifest> {
        let generation = Self::active_generation(root)?.ok_or_else(|| IndexError::NotBuilt {
            path: root.to_path_buf(),
        })?;
        IndexManifest::load(&root.join(&generation))
    }

    /// Open the active generation, checking it was built with `expected_model`.
    pub fn open(root: &Path, expected_model: &str) -> IndexResult<Self> {
        let generation = Self::active_generation(root)?.ok_or_else(|| IndexError::NotBuilt {
            path: root.to_path_buf(),
        })?;
        let generation_dir = root.join(&generation);
        if !generation_dir.is_dir() {
            return Err(IndexError::corrupt(
                &generation,
                "CURRENT points to a missing generation",
            ));
        }

        let manifest = IndexManifest::load(&generation_dir)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(IndexError::corrupt(
                &generation,
                format!("unsupported format version {}", manifest.format_version),
            ));
        }
        if manifest.embedding_model != expected_model {
            return Err(IndexError::ModelMismatch {
                indexed: manifest.embedding_model,
                configured: expected_model.to_string(),
            });
        }

        let chunks_path = generation_dir.join(CHUNKS_FILE);
        let content = fs::read_to_string(&chunks_path).map_err(|e| IndexError::io(&chunks_path, e))?;
        let chunks: Vec<String> = serde_json::from_str(&content)?;
        if chunks.len() != manifest.chunk_count || chunks.is_empty() {
            return Err(IndexError::corrupt(
                &generation,
                format!(
                    "manifest lists {} chunks, found {}",
                    manifest.chunk_count,
                    chunks.len()
                ),
            ));
        }

        let vectors_path = generation_dir.join(VECTORS_FILE);
        let file = File::open(&vectors_path).map_err(|e| IndexError::io(&vectors_path, e))?;
        // SAFETY: generations are immutable once committed; nothing writes to
        // vectors.bin after the pointer swap.
        let vectors = unsafe { Mmap::map(&file) }.map_err(|e| IndexError::io(&vectors_path, e))?;
        if vectors.len() != manifest.vectors_len() {
            return Err(IndexError::corrupt(
                &generation,
                format!(
                    "vectors.bin holds {} bytes, expected {}",
                    vectors.len(),
                    manifest.vectors_len()
                ),
            ));
        }

        tracing::debug!(
            target: "index",
            "opened generation {generation} ({} chunks, dim {})",
            manifest.chunk_count,
            manifest.dimension
        );

        Ok(Self {
            generation_dir,
            manifest,
            chunks,
            vectors,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn generation_dir(&self) -> &Path {
        &self.generation_dir
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Text of the chunk at `position`.
    pub fn chunk(&self, position: usize) -> Option<&str> {
        self.chunks.get(position).map(String::as_str)
    }

    /// Return the `k` chunks most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<ScoredChunk>> {
        if query.len() != self.manifest.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .map(|position| (position, cosine_similarity(query, &self.row(position))))
            .collect();

        // Sort by similarity descending; equal scores keep index order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                position,
                score,
                text: self.chunks[position].clone(),
            })
            .collect())
    }

    fn row(&self, position: usize) -> Vec<f32> {
        let width = self.manifest.dimension * std::mem::size_of::<f32>();
        self.vectors[position * width..(position + 1) * width]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
