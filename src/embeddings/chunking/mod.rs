#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Number of characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Split text into overlapping chunks of bounded size.
///
/// The split is a deterministic sliding window over characters: every chunk
/// except possibly the last has exactly `chunk_size` characters, consecutive
/// chunks share `chunk_overlap` characters, and concatenating the chunks with
/// overlaps removed reconstructs the input. Operating on `char` boundaries
/// keeps the output valid UTF-8 for any input.
///
/// Empty input yields no chunks; input shorter than `chunk_size` yields a
/// single chunk equal to the whole text.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    // Config validation enforces overlap < size; clamp anyway so a bad
    // config cannot make the window stop advancing.
    let overlap = config.chunk_overlap.min(size - 1);
    let step = size - overlap;

    let mut chunks = Vec::with_capacity(chars.len() / step + 1);
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Chunked {} chars into {} chunks (size {}, overlap {})",
        chars.len(),
        chunks.len(),
        size,
        overlap
    );

    chunks
}
