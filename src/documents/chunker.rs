//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and the sentence-aware sliding window used
//! to split extracted text into chunks suitable for embedding.

use super::config::ChunkingConfig;
use super::types::RawChunk;

/// Characters that end a sentence for boundary snapping.
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document content into chunks.
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk>;
}

/// Sliding-window chunker that snaps chunk ends to sentence boundaries.
///
/// Algorithm:
/// 1. Take a window of `chunk_chars` characters starting at the cursor
/// 2. If the window stops short of the text end, pull its end back to the
///    last sentence terminator inside it, but only when that terminator lies
///    past the window midpoint
/// 3. Emit the trimmed window, then move the cursor to `end - overlap_chars`
/// 4. Stop once a window reaches the end of the text
///
/// Text with no terminators is cut at raw size boundaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentenceChunker;

impl SentenceChunker {
    /// Create a new sentence chunker.
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = content.chars().collect();
        let total = chars.len();
        let size = config.chunk_chars.max(1);
        let overlap = config.overlap_chars.min(size - 1);

        if total <= size {
            return vec![RawChunk::new((0, total), content.trim().to_string())];
        }

        // Byte offset of every char position, including one past the end.
        let offsets: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let mut end = (start + size).min(total);

            if end < total {
                if let Some(boundary) = last_terminator(&chars, start, end) {
                    if boundary > start + size / 2 {
                        end = boundary + 1;
                    }
                }
            }

            let text = content[offsets[start]..offsets[end]].trim();
            if !text.is_empty() {
                chunks.push(RawChunk::new((start, end), text.to_string()));
            }

            if end >= total {
                break;
            }
            start = next_start(start, end, overlap);
        }

        chunks
    }
}

/// Position of the last sentence terminator in `chars[start..end]`.
fn last_terminator(chars: &[char], start: usize, end: usize) -> Option<usize> {
    chars[start..end]
        .iter()
        .rposition(|c| SENTENCE_TERMINATORS.contains(c))
        .map(|i| start + i)
}

/// Cursor for the next window: `overlap` characters before `end`, or `end`
/// itself when stepping back would not move past `start`.
fn next_start(start: usize, end: usize, overlap: usize) -> usize {
    let stepped = end.saturating_sub(overlap);
    if stepped > start { stepped } else { end }
}
