//! Retrieval-augmented answering.

mod confidence;
mod context;
pub mod metrics;
mod pipeline;
mod types;

pub use confidence::normalize_confidence;
pub use context::{assemble_context, UNKNOWN_PAGE, UNKNOWN_SOURCE};
pub use metrics::RagMetrics;
pub use pipeline::{QueryPipeline, QuerySettings, Stage};
pub use types::{AnswerResult, ConfidenceResult, RetrievalQuality};
