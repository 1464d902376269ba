//! On-disk vector index.
//!
//! Layout under the index root:
//!
//! ```text
//! faiss_index/
//!   CURRENT                  name of the active generation
//!   .lock                    held by the committing writer
//!   gen-<timestamp>-<n>/
//!     manifest.json          model, dimension, counts, digest
//!     chunks.json            chunk texts in index order
//!     vectors.bin            little-endian f32 rows
//! ```
//!
//! Each processing run writes a new generation and replaces `CURRENT`
//! atomically, so the index only ever holds the most recent batch. Commits
//! from different processes are serialized through `.lock`.

pub mod builder;
mod error;
pub mod manifest;
pub mod store;

pub use builder::{BuildError, IndexBuilder, IndexProgress, IndexWriter};
pub use error::{IndexError, IndexResult};
pub use manifest::{IndexManifest, source_digest};
pub use store::{ScoredChunk, VectorIndex, cosine_similarity};
