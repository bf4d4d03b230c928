//! Coalescing of adjacent chunks.

use super::types::Chunk;
use crate::tokenizer::Tokenizer;

/// Greedily merge each chunk with the chunks that follow it while the
/// space-joined text stays within `chunk_size` tokens.
pub fn coalesce<T: Tokenizer>(chunks: Vec<Chunk>, chunk_size: usize, tokenizer: &T) -> Vec<Chunk> {
    let mut merged = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter().peekable();

    while let Some(mut current) = iter.next() {
        while let Some(next) = iter.peek() {
            let joined = format!("{} {}", current.content, next.content);
            if tokenizer.count(&joined) > chunk_size {
                break;
            }
            current.content = joined;
            current.end_page = current.end_page.max(next.end_page);
            current.section_info.extend(next.section_info.iter().cloned());
            iter.next();
        }
        merged.push(current);
    }
    merged
}
