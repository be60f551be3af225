//! Document ingestion: discovery, loading, batching and the pipeline
//! that ties them together.

mod batch;
mod discovery;
mod loader;
mod markup;
mod office;
mod pipeline;

pub use batch::{ensure_collection, BatchCounters, BatchUpserter, UpsertSettings};
pub use discovery::{discover_files, is_supported, SUPPORTED_EXTENSIONS};
pub use loader::{DocumentLoader, FileKind, FileLoader};
pub use pipeline::IngestionPipeline;
