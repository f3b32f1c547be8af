//! Text chunking with configurable size and overlap.
//!
//! Chunk boundaries are pulled back to the nearest whitespace so words are
//! not split, falling back to a hard cut when a window has no whitespace.

use crate::types::ChunkCandidate;
use std::path::Path;

/// Chunk text into overlapping segments of at most `chunk_size` bytes.
pub fn chunk_text(
    source_id: &str,
    source_path: &Path,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let chunk_size = chunk_size.max(1);
    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = window_end(text, start, chunk_size);
        let piece = text[start..end].trim();

        if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position: chunks.len() as u32,
                text: piece.to_string(),
                metadata: serde_json::json!({
                    "source_path": source_path.to_string_lossy(),
                    "start": start,
                    "end": end,
                }),
            });
        }

        if end >= text.len() {
            break;
        }

        let mut next = ceil_char_boundary(text, (start + step).min(end));
        if next <= start {
            next = end;
        }
        if starts_mid_word(text, next) {
            next = text[next..end]
                .find(char::is_whitespace)
                .map(|offset| next + offset)
                .unwrap_or(end);
        }
        start = next;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// End of the window starting at `start`, pulled back to whitespace if possible.
fn window_end(text: &str, start: usize, chunk_size: usize) -> usize {
    let hard_end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
    if hard_end >= text.len() {
        return text.len();
    }
    if hard_end <= start {
        // A single char wider than the window.
        return text[start..]
            .char_indices()
            .nth(1)
            .map(|(i, _)| start + i)
            .unwrap_or(text.len());
    }

    match text[start..hard_end].rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => start + pos,
        _ => hard_end,
    }
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

fn starts_mid_word(text: &str, index: usize) -> bool {
    let before = text[..index].chars().next_back();
    let at = text[index..].chars().next();
    matches!((before, at), (Some(b), Some(a)) if !b.is_whitespace() && !a.is_whitespace())
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
