use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing the on-disk vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("No index found at '{}'. Process some documents first", path.display())]
    NotBuilt { path: PathBuf },

    #[error(
        "Index was built with embedding model '{indexed}' but '{configured}' is configured. Reprocess the documents"
    )]
    ModelMismatch { indexed: String, configured: String },

    #[error("Index generation '{generation}' is corrupt: {reason}")]
    Corrupt { generation: String, reason: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Refusing to write an index with no chunks")]
    Empty,

    #[error("IO error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(generation: &str, reason: impl Into<String>) -> Self {
        IndexError::Corrupt {
            generation: generation.to_string(),
            reason: reason.into(),
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
