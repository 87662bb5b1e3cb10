#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::debug;

use crate::documents::Document;

/// Separators tried in order, coarsest first. The empty separator splits
/// between characters and always succeeds.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// A bounded window of page text, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Display path of the source PDF
    pub source: String,
    /// 1-based page number within the source
    pub page_number: u32,
    /// Byte offset of `text` within the page text
    pub offset: usize,
    /// Position of this chunk within its page
    pub chunk_index: usize,
}

/// Configuration for content chunking, measured in characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Chunk every document, preserving document order
#[inline]
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|document| chunk_document(document, config))
        .collect();

    debug!(
        "Chunked {} pages into {} chunks (avg {} chars)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| c.text.chars().count()).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Chunk a single page
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let source = document.source.display().to_string();

    split_text(&document.text, config)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, range)| Chunk {
            text: slice(&document.text, range.clone()).to_string(),
            source: source.clone(),
            page_number: document.page_number,
            offset: range.start,
            chunk_index,
        })
        .collect()
}

/// Split text into overlapping windows of at most `chunk_size` characters.
///
/// Returns byte ranges into `text`. Each window is trimmed of surrounding
/// whitespace and is never empty. Pieces keep their leading separator, so
/// every window is a contiguous slice of the input.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    split_recursive(text, 0..text.len(), SEPARATORS, config, &mut windows);
    windows
}

fn split_recursive(
    text: &str,
    range: Range<usize>,
    separators: &[&str],
    config: &ChunkingConfig,
    out: &mut Vec<Range<usize>>,
) {
    let segment = slice(text, range.clone());

    let (separator, finer) = pick_separator(segment, separators);
    let pieces = split_keeping_separator(segment, separator)
        .into_iter()
        .map(|piece| (piece.start + range.start)..(piece.end + range.start));

    let mut small = Vec::new();
    for piece in pieces {
        if char_len(text, piece.clone()) < config.chunk_size {
            small.push(piece);
            continue;
        }

        if !small.is_empty() {
            merge_pieces(text, &small, config, out);
            small.clear();
        }

        if finer.is_empty() {
            if let Some(trimmed) = trim_range(text, piece) {
                out.push(trimmed);
            }
        } else {
            split_recursive(text, piece, finer, config, out);
        }
    }

    if !small.is_empty() {
        merge_pieces(text, &small, config, out);
    }
}

/// First separator present in `segment`, and the finer separators after it
fn pick_separator<'a, 's>(segment: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if segment.contains(separator) {
            return (*separator, separators.get(i + 1..).unwrap_or_default());
        }
    }
    ("", &[])
}

/// Split on `separator`, attaching each separator to the piece that follows it.
/// Ranges are relative to `segment`; empty pieces are dropped.
fn split_keeping_separator(segment: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(start, c)| start..start + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (position, _) in segment.match_indices(separator) {
        if position > start {
            pieces.push(start..position);
        }
        start = position;
    }
    if segment.len() > start {
        pieces.push(start..segment.len());
    }
    pieces
}

/// Greedily merge contiguous pieces into windows, carrying up to
/// `chunk_overlap` characters of trailing pieces into the next window.
fn merge_pieces(
    text: &str,
    pieces: &[Range<usize>],
    config: &ChunkingConfig,
    out: &mut Vec<Range<usize>>,
) {
    let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(text, piece.clone());

        if total + len > config.chunk_size && !window.is_empty() {
            if total > config.chunk_size {
                debug!(
                    "Created a chunk of {} chars, longer than the configured {}",
                    total, config.chunk_size
                );
            }
            if let Some(merged) = window_range(text, &window) {
                out.push(merged);
            }

            while total > config.chunk_overlap
                || (total + len > config.chunk_size && total > 0)
            {
                match window.pop_front() {
                    Some((_, dropped)) => total -= dropped,
                    None => break,
                }
            }
        }

        window.push_back((piece.clone(), len));
        total += len;
    }

    if let Some(merged) = window_range(text, &window) {
        out.push(merged);
    }
}

fn window_range(
    text: &str,
    window: &VecDeque<(Range<usize>, usize)>,
) -> Option<Range<usize>> {
    let start = window.front()?.0.start;
    let end = window.back()?.0.end;
    trim_range(text, start..end)
}

/// Shrink a range to exclude surrounding whitespace; `None` when nothing is left
fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let segment = slice(text, range.clone());
    let leading = segment.len() - segment.trim_start().len();
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = range.start + leading;
    Some(start..start + trimmed.len())
}

fn char_len(text: &str, range: Range<usize>) -> usize {
    slice(text, range).chars().count()
}

/// Ranges produced here always fall on char boundaries
fn slice(text: &str, range: Range<usize>) -> &str {
    text.get(range).unwrap_or_default()
}
