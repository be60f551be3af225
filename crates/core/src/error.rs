//! Error types for Docent.
//!
//! A single enum covers configuration, index, embedding, generation,
//! document loading and prompt failures. Backend failures are carried
//! unchanged to the caller; nothing in the core retries them.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for Docent.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required setting is missing or invalid. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A query or upsert targeted a collection that does not exist.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Network or storage failure inside the vector index.
    #[error("Retrieval backend error: {0}")]
    RetrievalBackend(String),

    /// Failure reported by the generation collaborator.
    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    /// Failure reported by the embedding collaborator.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The loader has no parser for this file format.
    #[error("Unsupported file: {0:?}")]
    UnsupportedFile(PathBuf),

    /// A supported file could not be read or parsed.
    #[error("Document error: {0}")]
    Document(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error came from one of the remote backends
    /// (index, embedding or generation).
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            AppError::RetrievalBackend(_) | AppError::GenerationBackend(_) | AppError::Embedding(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
