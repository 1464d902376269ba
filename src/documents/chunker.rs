//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and the recursive boundary chunker used to
//! split extracted PDF text into overlapping chunks for embedding.

use super::config::ChunkingConfig;

/// A raw chunk of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Byte range in the source text (start, end).
    pub byte_range: (usize, usize),

    /// The text content of this chunk.
    pub content: String,
}

impl RawChunk {
    /// Create a new raw chunk.
    pub fn new(byte_range: (usize, usize), content: String) -> Self {
        Self {
            byte_range,
            content,
        }
    }

    /// Get character count.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document content into chunks.
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk>;
}

/// Recursive boundary chunker: sliding window with semantic cut points.
///
/// Algorithm:
/// 1. Open a window of at most `max_chunk_chars` at the current start
/// 2. Cut at the last paragraph break in the back half of the window,
///    else the last line break, else the last sentence end, else the last
///    whitespace, else hard-cut at the window edge
/// 3. Start the next window exactly `overlap_chars` before the cut
///
/// Adjacent chunks therefore share exactly `overlap_chars` characters, and
/// only the final chunk may be shorter than the window.
#[derive(Debug, Default)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    /// Create a new recursive chunker.
    pub fn new() -> Self {
        Self
    }
}

/// Cut points, from the most to the least preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    /// Whether a chunk ending before char index `end` ends right after this boundary.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        match self {
            Boundary::Paragraph => end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n',
            Boundary::Line => end >= 1 && chars[end - 1] == '\n',
            Boundary::Sentence => {
                end >= 2
                    && chars[end - 1].is_whitespace()
                    && matches!(chars[end - 2], '.' | '?' | '!')
            }
            Boundary::Word => end >= 1 && chars[end - 1].is_whitespace(),
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let max_chars = config.max_chunk_chars.max(1);
        let overlap = config.overlap_chars.min(max_chars - 1);

        let chars: Vec<char> = content.chars().collect();
        let byte_offsets: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= max_chars {
                chunks.push(slice_chunk(content, &byte_offsets, start, chars.len()));
                break;
            }

            // A cut must leave room for new content past the overlap, and
            // cutting in the front half would produce needlessly small chunks.
            let latest = start + max_chars;
            let earliest = start + (overlap + 1).max(max_chars / 2);
            let end = find_cut(&chars, earliest, latest).unwrap_or(latest);

            chunks.push(slice_chunk(content, &byte_offsets, start, end));
            start = end - overlap;
        }

        chunks
    }
}

/// Find the best cut in `earliest..=latest` (char indices, exclusive chunk end).
fn find_cut(chars: &[char], earliest: usize, latest: usize) -> Option<usize> {
    BOUNDARIES.iter().find_map(|boundary| {
        (earliest..=latest)
            .rev()
            .find(|&end| boundary.ends_at(chars, end))
    })
}

fn slice_chunk(content: &str, byte_offsets: &[usize], start: usize, end: usize) -> RawChunk {
    let byte_range = (byte_offsets[start], byte_offsets[end]);
    RawChunk::new(byte_range, content[byte_range.0..byte_range.1].to_string())
}
