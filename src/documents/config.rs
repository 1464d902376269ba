//! Configuration types for document chunking.

use serde::{Deserialize, Serialize};

/// Configuration for document chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters. Larger spans are split.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    50_000
}

fn default_overlap_chars() -> usize {
    1_000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl ChunkingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than zero".to_string());
        }

        if self.overlap_chars >= self.max_chunk_chars {
            return Err(format!(
                "overlap_chars ({}) must be less than max_chunk_chars ({})",
                self.overlap_chars, self.max_chunk_chars
            ));
        }

        Ok(())
    }
}
