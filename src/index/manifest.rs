//! Generation manifest and on-disk layout.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{IndexError, IndexResult};

/// Version of the generation directory layout.
pub const FORMAT_VERSION: u32 = 1;

/// Pointer file naming the active generation.
pub const CURRENT_FILE: &str = "CURRENT";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const GENERATION_PREFIX: &str = "gen-";
pub const STAGING_PREFIX: &str = ".staging-";

/// Advisory lock held by a writer while it commits, across processes.
pub const LOCK_FILE: &str = ".lock";

/// Describes one committed index generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,

    /// Directory name of this generation under the index root
    pub generation: String,

    /// Embedding model that produced the vectors
    pub embedding_model: String,

    pub dimension: usize,
    pub chunk_count: usize,

    /// SHA-256 of the extracted text the chunks came from
    pub source_digest: String,

    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Load the manifest stored in a generation directory.
    pub fn load(generation_dir: &Path) -> IndexResult<Self> {
        let path = generation_dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| IndexError::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the manifest into a generation directory.
    pub fn save(&self, generation_dir: &Path) -> IndexResult<()> {
        let path = generation_dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|e| IndexError::io(&path, e))
    }

    /// Size in bytes `vectors.bin` must have for this manifest.
    pub fn vectors_len(&self) -> usize {
        self.chunk_count * self.dimension * std::mem::size_of::<f32>()
    }
}

/// Hex SHA-256 of the text an index was built from.
pub fn source_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_save_and_load() {
        let dir = TempDir::new().unwrap();
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            generation: "gen-20260101T000000000Z-00".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            dimension: 768,
            chunk_count: 3,
            source_digest: source_digest("hello"),
            created_at: Utc::now(),
        };

        manifest.save(dir.path()).unwrap();
        let loaded = IndexManifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.vectors_len(), 3 * 768 * 4);
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            IndexManifest::load(dir.path()),
            Err(IndexError::Io { .. })
        ));
    }

    #[test]
    fn test_source_digest_is_stable() {
        assert_eq!(
            source_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(source_digest("abc"), source_digest("abd"));
    }
}
