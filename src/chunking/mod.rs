//! Fixed-size text chunking.
//!
//! Splits text into contiguous, non-overlapping windows of `chunk_size`
//! characters. Slicing is purely positional: a chunk may end mid-word or
//! mid-sentence.

use crate::error::{Result, TldwError};

/// Characters per chunk used for both corpus and query documents.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Split `text` into chunks of exactly `chunk_size` characters.
///
/// The last chunk holds the remainder (1..=`chunk_size` characters).
/// Characters are Unicode scalar values, so a multi-byte code point is
/// never split.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<&str>> {
    if text.is_empty() {
        return Err(TldwError::InvalidInput("text is empty".to_string()));
    }
    if chunk_size == 0 {
        return Err(TldwError::InvalidInput(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk_text("abcdef", 3).unwrap();
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_remainder_in_last_chunk() {
        let chunks = chunk_text("abcdefg", 3).unwrap();
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_shorter_than_chunk_size() {
        let chunks = chunk_text("hello", 256).unwrap();
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_concatenation_reproduces_text() {
        let text = "It was the best of times, it was the worst of times, it was the age of wisdom.";
        for size in [1, 2, 7, 16, 80, 500] {
            let chunks = chunk_text(text, size).unwrap();
            assert_eq!(chunks.concat(), text);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.chars().count() == size));
            let last_len = last.chars().count();
            assert!(last_len >= 1 && last_len <= size);
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let chunks = chunk_text("héllo wörld", 4).unwrap();
        assert_eq!(chunks, vec!["héll", "o wö", "rld"]);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(matches!(chunk_text("", 256), Err(TldwError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(chunk_text("abc", 0), Err(TldwError::InvalidInput(_))));
    }
}
