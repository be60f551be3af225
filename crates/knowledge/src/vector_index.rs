//! Vector index abstraction.
//!
//! Defines the contract the ingestion and query pipelines need from a
//! vector store, independent of the backend that implements it.

use crate::types::{IndexRecord, RetrievedDocument};
use docent_core::{AppResult, DistanceMetric, ScoreScale};

/// Trait for vector index backends.
///
/// One instance is shared by every request behind an `Arc`, so all methods
/// take `&self`. Collections are matched by exact name.
///
/// Implementations must support:
/// - Creating a collection with a fixed dimension and distance metric
/// - Upserting records keyed by id (re-upserting an id replaces it)
/// - Returning the k nearest records, best first, with raw scores
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name (e.g., "sqlite", "lancedb").
    fn backend_name(&self) -> &str;

    /// How raw scores from [`VectorIndex::query_similar`] should be read for
    /// a collection using `metric`.
    fn native_score_scale(&self, metric: DistanceMetric) -> ScoreScale;

    async fn collection_exists(&self, collection: &str) -> AppResult<bool>;

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> AppResult<()>;

    /// Vector dimension of an existing collection, `None` if it does not exist.
    async fn collection_dimension(&self, collection: &str) -> AppResult<Option<usize>>;

    /// Insert or replace records. Fails with `CollectionNotFound` when the
    /// collection is missing.
    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> AppResult<()>;

    /// Search for the `k` records nearest to `vector`.
    ///
    /// Returns `(document, raw_score)` pairs ordered best first. Fails with
    /// `CollectionNotFound` rather than returning an empty list when the
    /// collection is missing.
    async fn query_similar(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<(RetrievedDocument, f32)>>;

    /// Number of records stored in a collection.
    async fn count(&self, collection: &str) -> AppResult<usize>;
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product = dot(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
