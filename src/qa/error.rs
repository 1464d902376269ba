use std::path::PathBuf;
use thiserror::Error;

use crate::index::{BuildError, IndexError};
use crate::provider::ProviderError;

/// Errors from a "Submit & Process" action. Nothing is committed when one
/// of these is returned.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("No text could be extracted from the {uploaded} uploaded file(s)")]
    NothingToIndex { uploaded: usize },

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Embedding failed: {0}")]
    Embedding(ProviderError),

    #[error(transparent)]
    Index(IndexError),

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl ProcessError {
    /// Stable identifier used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::NothingToIndex { .. } => "nothing_to_index",
            ProcessError::InvalidChunking(_) => "invalid_config",
            ProcessError::Embedding(ProviderError::MissingCredential) => "missing_credential",
            ProcessError::Embedding(e) if e.is_malformed() => "malformed_response",
            ProcessError::Embedding(_) => "remote_service",
            ProcessError::Index(_) => "index_error",
            ProcessError::Task(_) => "internal",
        }
    }
}

impl From<BuildError> for ProcessError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Embedding(e) => ProcessError::Embedding(e),
            BuildError::Index(e) => ProcessError::Index(e),
            BuildError::VectorCountMismatch { expected, actual } => {
                ProcessError::Embedding(ProviderError::Malformed {
                    endpoint: "embedding service".to_string(),
                    reason: format!("{actual} vectors for {expected} texts"),
                })
            }
            BuildError::NoChunks => ProcessError::NothingToIndex { uploaded: 0 },
            BuildError::Task(reason) => ProcessError::Task(reason),
        }
    }
}

/// Errors from asking a question.
#[derive(Error, Debug)]
pub enum AskError {
    #[error("Please enter a question")]
    EmptyQuestion,

    #[error("No documents have been processed yet (no index at '{}')", path.display())]
    IndexMissing { path: PathBuf },

    #[error(
        "The index was built with '{indexed}' but '{configured}' is configured. Process the documents again"
    )]
    ModelMismatch { indexed: String, configured: String },

    #[error(transparent)]
    Index(IndexError),

    #[error("Remote service error: {0}")]
    Remote(ProviderError),

    #[error("Unusable reply from remote service: {0}")]
    MalformedResponse(ProviderError),

    #[error("Question task failed: {0}")]
    Task(String),
}

impl AskError {
    /// Stable identifier used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AskError::EmptyQuestion => "empty_question",
            AskError::IndexMissing { .. } => "index_missing",
            AskError::ModelMismatch { .. } => "model_mismatch",
            AskError::Index(_) => "index_error",
            AskError::Remote(_) => "remote_service",
            AskError::MalformedResponse(_) => "malformed_response",
            AskError::Task(_) => "internal",
        }
    }
}

impl From<IndexError> for AskError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::NotBuilt { path } => AskError::IndexMissing { path },
            IndexError::ModelMismatch {
                indexed,
                configured,
            } => AskError::ModelMismatch {
                indexed,
                configured,
            },
            other => AskError::Index(other),
        }
    }
}

impl From<ProviderError> for AskError {
    fn from(error: ProviderError) -> Self {
        if error.is_malformed() {
            AskError::MalformedResponse(error)
        } else {
            AskError::Remote(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_errors_classify() {
        let missing: AskError = IndexError::NotBuilt {
            path: PathBuf::from("faiss_index"),
        }
        .into();
        assert_eq!(missing.kind(), "index_missing");

        let mismatch: AskError = IndexError::ModelMismatch {
            indexed: "a".into(),
            configured: "b".into(),
        }
        .into();
        assert_eq!(mismatch.kind(), "model_mismatch");

        let other: AskError = IndexError::Empty.into();
        assert_eq!(other.kind(), "index_error");
    }

    #[test]
    fn test_provider_errors_classify() {
        let malformed: AskError = ProviderError::Malformed {
            endpoint: "x".into(),
            reason: "no candidates".into(),
        }
        .into();
        assert_eq!(malformed.kind(), "malformed_response");

        let status: AskError = ProviderError::Status {
            endpoint: "x".into(),
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        assert_eq!(status.kind(), "remote_service");
    }

    #[test]
    fn test_build_errors_map_to_process_errors() {
        let err: ProcessError = BuildError::VectorCountMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(err.kind(), "malformed_response");

        let err: ProcessError = BuildError::Embedding(ProviderError::MissingCredential).into();
        assert_eq!(err.kind(), "missing_credential");
    }
}
