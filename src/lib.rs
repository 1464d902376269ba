pub mod cli;
pub mod config;
pub mod documents;
pub mod index;
pub mod logging;
pub mod provider;
pub mod qa;
#[cfg(feature = "http-server")]
pub mod server;
pub mod testing;

pub use config::Settings;
pub use documents::{ChunkingConfig, UploadedDocument};
pub use index::{IndexError, IndexManifest, VectorIndex};
pub use provider::{ChatModel, EmbeddingProvider, ProviderError};
pub use qa::{Answer, AskError, Assistant, ProcessError, ProcessReport};
