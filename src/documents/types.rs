//! Core types for document ingestion.

use serde::Serialize;
use std::path::Path;

/// Raw bytes of one uploaded PDF, kept only for the duration of a processing action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Name the file was uploaded under.
    pub filename: String,

    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Create a new uploaded document.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a document from disk, using the file name as the upload name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        Ok(Self { filename, bytes })
    }

    /// Whether the content carries the PDF header magic.
    pub fn looks_like_pdf(&self) -> bool {
        // The header may be preceded by a few junk bytes in the wild.
        let head = &self.bytes[..self.bytes.len().min(1024)];
        head.windows(5).any(|w| w == b"%PDF-")
    }
}

/// Text extracted from one upload batch.
///
/// All pages of all documents are concatenated in upload order without any
/// separator; no document or page boundary survives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    /// The concatenated text.
    pub text: String,

    /// Number of documents that produced pages.
    pub documents_read: usize,

    /// Number of pages appended.
    pub pages_read: usize,
}

impl ExtractedText {
    /// True when nothing but whitespace was extracted.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get the length of the text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
