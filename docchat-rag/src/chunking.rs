//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - splits by character count with configurable overlap
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes are measured in `char`s, never bytes, so multi-byte text is never cut
//! inside a code point.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{DocumentChunk, SourceDocument};

/// Separators tried in order by [`RecursiveChunker`].
const RECURSIVE_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", "? ", " "];

/// A strategy for splitting text into chunks.
///
/// Implementors only provide [`split`](Chunker::split); [`chunk`](Chunker::chunk)
/// turns the pieces into [`DocumentChunk`]s with fresh UUIDs.
pub trait Chunker: Send + Sync {
    /// Split text into ordered pieces. Returns an empty `Vec` for empty text.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split a document into chunks carrying provenance metadata.
    ///
    /// Every call generates new ids, so ingesting the same document twice
    /// yields two independent sets of chunks.
    fn chunk(&self, document: &SourceDocument) -> Vec<DocumentChunk> {
        let pieces = self.split(&document.text);
        let chunk_count = pieces.len();
        let created_at = Utc::now();
        let file_path = document.path.display().to_string();

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| DocumentChunk {
                id: Uuid::new_v4().to_string(),
                text,
                source_file: document.source.clone(),
                file_path: file_path.clone(),
                chunk_index,
                chunk_count,
                created_at,
            })
            .collect()
    }
}

/// Which [`Chunker`] the pipeline should build from [`RagConfig`](crate::RagConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// [`FixedSizeChunker`].
    #[default]
    Fixed,
    /// [`RecursiveChunker`].
    Recursive,
}

/// Splits text into fixed-size windows with configurable overlap.
///
/// A text of `L` characters with size `S` and overlap `O < S` yields
/// `⌈(L − O) / (S − O)⌉` chunks, and exactly one chunk when `L ≤ S`.
///
/// # Example
///
/// ```rust
/// use docchat_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(1000, 200);
/// let text = "x".repeat(3000);
/// assert_eq!(chunker.split(&text).len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_by_size(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// Segments are merged greedily up to `chunk_size`; when a chunk is emitted,
/// trailing segments totalling at most `chunk_overlap` characters are carried
/// into the next one. A segment that is still too long is split again with the
/// next separator, and a single word longer than `chunk_size` falls back to
/// fixed-size windows. Emitted chunks are trimmed and never empty.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_and_merge(text, self.chunk_size, self.chunk_overlap, &RECURSIVE_SEPARATORS)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Character-window splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return if text.is_empty() { Vec::new() } else { vec![text.to_string()] };
    }
    let Some((separator, remaining)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut window_len = 0;

    let flush = |window: &[&str], chunks: &mut Vec<String>| {
        let joined = window.concat();
        if char_len(&joined) > chunk_size {
            chunks.extend(split_and_merge(&joined, chunk_size, chunk_overlap, remaining));
        } else if !joined.trim().is_empty() {
            chunks.push(joined);
        }
    };

    for segment in split_keeping_separator(text, separator) {
        let segment_len = char_len(segment);
        if window_len + segment_len > chunk_size && !window.is_empty() {
            flush(&window, &mut chunks);
            // keep a tail of at most `chunk_overlap` chars that still leaves room
            while !window.is_empty()
                && (window_len > chunk_overlap || window_len + segment_len > chunk_size)
            {
                window_len -= char_len(window.remove(0));
            }
        }
        window.push(segment);
        window_len += segment_len;
    }

    if !window.is_empty() {
        flush(&window, &mut chunks);
    }

    chunks
}
