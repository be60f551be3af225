//! Recursive separator-hierarchy splitter.

use super::metadata::chunk_id;
use crate::types::{Chunk, SourceDocument};
use docent_core::{AppError, AppResult};
use std::collections::VecDeque;

/// Splits text into chunks of at most `chunk_size` characters, sharing up to
/// `chunk_overlap` characters between neighbours.
///
/// The first separator present in the text is used to cut it into pieces.
/// Pieces that are still too long are split again with the remaining
/// separators. The empty separator cuts between characters, so the
/// recursion always terminates. Lengths are counted in chars.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl ChunkSplitter {
    /// Create a splitter. An empty separator is appended when the list does
    /// not already end with one.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let mut separators = separators;
        if separators.last().map(|s| !s.is_empty()).unwrap_or(true) {
            separators.push(String::new());
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Split a document into chunks that inherit its metadata.
    pub fn split_document(&self, document: &SourceDocument) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(position, text)| {
                let position = position as u32;
                Chunk {
                    id: chunk_id(&document.metadata, position, &text),
                    position,
                    text,
                    metadata: document.metadata.clone(),
                }
            })
            .collect()
    }

    /// Split raw text. Chunks are trimmed and never empty.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying a tail of at most
    /// `chunk_overlap` characters into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::debug!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than chunk_size"
                    );
                }

                if !window.is_empty() {
                    if let Some(chunk) = join_window(&window) {
                        chunks.push(chunk);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match window.pop_front() {
                            Some((_, dropped)) => total -= dropped,
                            None => break,
                        }
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// First separator present in `text`, plus the finer separators after it.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split so that each separator occurrence starts the following piece.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;
    use docent_core::config::default_separators;

    fn splitter(size: usize, overlap: usize) -> ChunkSplitter {
        ChunkSplitter::new(size, overlap, default_separators()).unwrap()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(ChunkSplitter::new(10, 10, default_separators()).is_err());
        assert!(ChunkSplitter::new(0, 0, default_separators()).is_err());
    }

    #[test]
    fn test_appends_empty_separator() {
        let s = ChunkSplitter::new(10, 0, vec!["\n\n".to_string()]).unwrap();
        assert_eq!(s.separators.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_word_split_with_overlap() {
        let chunks = splitter(10, 5).split_text("aaaa bbbb cccc dddd");
        assert_eq!(chunks, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
    }

    #[test]
    fn test_character_split_when_no_separator_matches() {
        let chunks = splitter(4, 1).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_prefers_heading_boundaries() {
        let text = "intro\n# One\nalpha\n# Two\nbeta";
        let chunks = splitter(15, 0).split_text(text);
        assert_eq!(chunks, vec!["intro", "# One\nalpha", "# Two\nbeta"]);
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunks = splitter(60, 10).split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 60, "chunk too long: {:?}", chunk);
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let text = "привет мир как дела сегодня";
        let chunks = splitter(12, 0).split_text(text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 12);
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(splitter(10, 2).split_text("   \n\n  ").is_empty());
        assert!(splitter(10, 2).split_text("").is_empty());
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = "Paragraph one.\n\nParagraph two is longer.\n\n# Heading\nBody text here.".repeat(5);
        let s = splitter(40, 8);
        assert_eq!(s.split_text(&text), s.split_text(&text));
    }

    #[test]
    fn test_split_document_copies_metadata() {
        let doc = SourceDocument::new(
            "one two three four five six seven",
            DocumentMetadata::new("notes.txt", Some(4)),
        );
        let chunks = splitter(10, 0).split_document(&doc);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i as u32);
            assert_eq!(chunk.metadata, doc.metadata);
        }

        let again = splitter(10, 0).split_document(&doc);
        assert_eq!(chunks, again);
    }
}
