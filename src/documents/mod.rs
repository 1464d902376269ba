//! Document ingestion and chunking for retrieval.
//!
//! This module provides:
//! - PDF text extraction from uploaded byte streams
//! - Chunking with semantic cut points and exact overlap

pub mod chunker;
pub mod config;
pub mod extract;
pub mod types;

pub use chunker::{Chunker, RawChunk, RecursiveChunker};
pub use config::ChunkingConfig;
pub use extract::{extract_pages, extract_text};
pub use types::{ExtractedText, UploadedDocument};
