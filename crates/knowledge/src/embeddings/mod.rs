//! Text embedding providers.
//!
//! The ingestion and query pipelines only see [`EmbeddingProvider`]; which
//! model produces the vectors is a configuration choice.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::hashing::HashingProvider;
pub use providers::ollama::OllamaProvider;
