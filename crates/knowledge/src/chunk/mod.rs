//! Recursive character chunking.
//!
//! Documents are split along a separator hierarchy (headings, paragraphs,
//! lines, words, characters) into bounded, overlapping chunks. The output is
//! a pure function of the input text and configuration.

mod metadata;
mod splitter;

pub use metadata::chunk_id;
pub use splitter::ChunkSplitter;
