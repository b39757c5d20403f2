//! Fixed-window text chunker with overlap.
//!
//! Splits document content into [`Chunk`]s of `chunk_size` characters,
//! each sharing `overlap` characters with its predecessor so that a fact
//! straddling a window boundary still lands whole in at least one chunk.
//! The final chunk may be shorter. Windows are measured in characters,
//! never raw bytes, so multi-byte text cannot split mid-codepoint.
//!
//! Each chunk receives a deterministic id derived from its parent
//! document id and index, which keeps re-ingestion of identical content
//! from growing the chunk table.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split text into overlapping windows. Returns chunks with contiguous
/// indices starting at 0; always at least one chunk, even for empty text.
pub fn chunk_text(document_id: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    // overlap >= chunk_size would never advance; config validation
    // rejects it, but degrade to non-overlapping windows here anyway.
    let step = if overlap < chunk_size {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let char_offsets: Vec<usize> = text
        .char_indices()
        .map(|(byte_pos, _)| byte_pos)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = char_offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + chunk_size).min(char_count);
        let piece = &text[char_offsets[start]..char_offsets[end]];
        chunks.push(make_chunk(document_id, index, piece));
        index += 1;

        if end >= char_count {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(b":");
    hasher.update(index.to_le_bytes());
    let id = format!("{:x}", hasher.finalize());

    Chunk {
        id,
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}
