//! Line-boundary text chunker.
//!
//! Diagnostic artifacts are line-oriented command output, so chunks are
//! packed from whole lines up to a character budget instead of prose
//! paragraphs.

use uuid::Uuid;

/// Character budget per chunk. Command output lines are short, so this
/// keeps each embedded chunk within a comfortable context window.
pub const MAX_CHUNK_CHARS: usize = 2048;

/// A chunk of one artifact's text, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
}

/// Split artifact text into chunks on line boundaries, respecting
/// `max_chars`. Returns chunks with contiguous indices starting at 0;
/// at least one chunk is always produced.
pub fn chunk_text(document_id: &str, text: &str, max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut index: i64 = 0;

    for line in text.lines() {
        let needed = if buf.is_empty() {
            line.len()
        } else {
            buf.len() + 1 + line.len()
        };

        if needed > max_chars && !buf.is_empty() {
            chunks.push(make_chunk(document_id, index, &buf));
            index += 1;
            buf.clear();
        }

        if line.len() > max_chars {
            // A single oversized line is hard-split at the budget.
            let mut remaining = line;
            while remaining.len() > max_chars {
                let mut split = floor_char_boundary(remaining, max_chars);
                if split == 0 {
                    // Budget smaller than one character's UTF-8 width:
                    // take a whole character anyway so the loop advances.
                    split = remaining
                        .chars()
                        .next()
                        .map_or(remaining.len(), char::len_utf8);
                }
                let (piece, rest) = remaining.split_at(split);
                chunks.push(make_chunk(document_id, index, piece));
                index += 1;
                remaining = rest;
            }
            buf.push_str(remaining);
        } else {
            if !buf.is_empty() {
                buf.push('\n');
            }
            buf.push_str(line);
        }
    }

    if !buf.is_empty() || chunks.is_empty() {
        chunks.push(make_chunk(document_id, index, &buf));
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}

/// Largest byte offset `<= at` that lands on a char boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut at = at.min(s.len());
    while at > 0 && !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}
