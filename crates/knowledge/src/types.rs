//! Document and chunk types shared by ingestion and retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribution carried from a source file down to every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the file the text came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 1-based page, slide or sheet number, when the format has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            source: Some(source.into()),
            page,
        }
    }
}

/// Text produced by a loader. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A contiguous piece of a [`SourceDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id derived from attribution, position and text
    pub id: String,

    /// Sequence index within the parent document (0-indexed)
    pub position: u32,

    pub text: String,

    /// Copied unchanged from the parent document
    pub metadata: DocumentMetadata,
}

/// One embedded chunk as written to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub collection: String,
    pub started_at: DateTime<Utc>,
    pub files_discovered: u64,
    pub files_loaded: u64,
    pub files_failed: u64,
    pub documents_processed: u64,
    pub chunks_buffered: u64,
    pub chunks_flushed: u64,
    pub flushes: u64,
    pub duration_secs: f64,
}

impl IngestReport {
    pub fn empty(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            started_at: Utc::now(),
            files_discovered: 0,
            files_loaded: 0,
            files_failed: 0,
            documents_processed: 0,
            chunks_buffered: 0,
            chunks_flushed: 0,
            flushes: 0,
            duration_secs: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_omits_missing_fields() {
        let json = serde_json::to_string(&DocumentMetadata::default()).unwrap();
        assert_eq!(json, "{}");

        let meta: DocumentMetadata = serde_json::from_str(r#"{"source":"a.pdf","page":3}"#).unwrap();
        assert_eq!(meta, DocumentMetadata::new("a.pdf", Some(3)));
    }
}
