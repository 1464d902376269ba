//! Retrieval-augmented question answering over processed documents.

pub mod assistant;
mod error;
pub mod prompt;

pub use assistant::{Answer, Assistant, ProcessReport};
pub use error::{AskError, ProcessError};
pub use prompt::{PROMPT_TEMPLATE, REFUSAL_ANSWER, is_refusal, render_prompt};
