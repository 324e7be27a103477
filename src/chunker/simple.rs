//! Simple character-based text chunking

/// Approximate characters per token
const CHARS_PER_TOKEN: usize = 4;

/// Simple chunker that splits by character count with word boundary awareness
#[derive(Debug, Clone)]
pub struct SimpleChunker {
    /// Approximate chunk size in tokens (1 token ~= 4 chars)
    chunk_size: usize,
    /// Overlap size in tokens
    chunk_overlap: usize,
}

impl SimpleChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            // Overlap must leave room for progress
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into ordered, trimmed, non-empty chunk texts
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let char_chunk_size = self.chunk_size * CHARS_PER_TOKEN;
        let char_overlap = self.chunk_overlap * CHARS_PER_TOKEN;

        if text.len() <= char_chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let end = floor_char_boundary(text, (start + char_chunk_size).min(text.len()));

            // Try to break at word boundary
            let chunk_end = if end < text.len() {
                text[start..end]
                    .rfind(char::is_whitespace)
                    .filter(|&pos| pos > 0)
                    .map(|pos| start + pos)
                    .unwrap_or(end)
            } else {
                end
            };

            let chunk_text = text[start..chunk_end].trim();
            if !chunk_text.is_empty() {
                chunks.push(chunk_text.to_string());
            }

            if chunk_end >= text.len() {
                break;
            }

            // Move start with overlap
            let next = if chunk_end > start + char_overlap {
                floor_char_boundary(text, chunk_end - char_overlap)
            } else {
                chunk_end
            };
            start = if next > start { next } else { chunk_end };
        }

        chunks
    }
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
