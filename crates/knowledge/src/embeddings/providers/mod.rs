//! Embedding provider implementations.

pub mod hashing;
pub mod ollama;
