//! Document ingestion and retrieval-augmented answering.
//!
//! Two pipelines share one vector index contract:
//! - [`IngestionPipeline`]: files → documents → chunks → vectors
//! - [`QueryPipeline`]: question → retrieved chunks → context → answer

pub mod chunk;
pub mod embeddings;
pub mod ingest;
pub mod lancedb_index;
pub mod progress;
pub mod rag;
pub mod services;
pub mod sqlite_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunk::ChunkSplitter;
pub use embeddings::EmbeddingProvider;
pub use ingest::{BatchUpserter, DocumentLoader, FileLoader, IngestionPipeline, UpsertSettings};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{AnswerResult, QueryPipeline, QuerySettings, RagMetrics, RetrievalQuality};
pub use types::{Chunk, DocumentMetadata, IndexRecord, IngestReport, RetrievedDocument, SourceDocument};
pub use vector_index::VectorIndex;
