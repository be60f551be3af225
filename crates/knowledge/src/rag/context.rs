//! Rendering retrieved chunks into the prompt's context block.

use crate::types::RetrievedDocument;
use std::fmt::Write;

pub const UNKNOWN_SOURCE: &str = "unknown source";
pub const UNKNOWN_PAGE: &str = "?";

/// Render documents, in the order given, as numbered excerpts labelled
/// with their source and page.
///
/// Each excerpt is `\n--- Excerpt {rank} (source: {source}, page: {page}) ---\n{text}\n`
/// with a 1-based rank. An empty slice renders as an empty string.
pub fn assemble_context(documents: &[RetrievedDocument]) -> String {
    let mut context = String::new();

    for (i, doc) in documents.iter().enumerate() {
        let source = doc.metadata.source.as_deref().unwrap_or(UNKNOWN_SOURCE);
        let page = doc
            .metadata
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| UNKNOWN_PAGE.to_string());

        // Writing into a String cannot fail
        let _ = write!(
            context,
            "\n--- Excerpt {} (source: {}, page: {}) ---\n{}\n",
            i + 1,
            source,
            page,
            doc.text
        );
    }

    context
}
