//! Buffered, batch-at-a-time writes into the vector index.

use crate::embeddings::EmbeddingProvider;
use crate::progress::ProgressReporter;
use crate::types::{Chunk, IndexRecord};
use crate::vector_index::VectorIndex;
use docent_core::{AppError, AppResult, DistanceMetric};
use serde::Serialize;
use std::sync::Arc;

/// Where and how the upserter writes.
#[derive(Debug, Clone)]
pub struct UpsertSettings {
    pub collection: String,
    /// Vector dimension the collection is created with (and asserted against)
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub batch_size: usize,
}

/// Running totals of one upserter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounters {
    pub chunks_buffered: u64,
    pub chunks_flushed: u64,
    pub documents_processed: u64,
    pub flushes: u64,
}

/// Make sure `collection` exists with `dimension`-long vectors.
///
/// Creates it when missing and returns `true`. An existing collection with
/// a different dimension is a configuration error.
pub async fn ensure_collection(
    index: &dyn VectorIndex,
    collection: &str,
    dimension: usize,
    metric: DistanceMetric,
) -> AppResult<bool> {
    if !index.collection_exists(collection).await? {
        index.create_collection(collection, dimension, metric).await?;
        return Ok(true);
    }

    match index.collection_dimension(collection).await? {
        Some(existing) if existing != dimension => Err(AppError::Config(format!(
            "Collection '{}' stores {}-dimensional vectors but vector_dimension is {}",
            collection, existing, dimension
        ))),
        _ => {
            tracing::debug!(collection, dimension, "Using existing collection");
            Ok(false)
        }
    }
}

/// Buffers chunks and writes them in fixed-size batches.
///
/// A batch is embedded with one provider call and written with one index
/// call. Flushes run one at a time and are never retried: a failed flush
/// returns its error and the batch is dropped from the buffer. Chunk ids are
/// deterministic, so re-running the ingestion overwrites instead of
/// duplicating.
pub struct BatchUpserter {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: UpsertSettings,
    buffer: Vec<Chunk>,
    collection_ready: bool,
    counters: BatchCounters,
    progress: ProgressReporter,
}

impl BatchUpserter {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: UpsertSettings,
    ) -> AppResult<Self> {
        if settings.batch_size == 0 {
            return Err(AppError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            buffer: Vec::with_capacity(settings.batch_size),
            index,
            embedder,
            settings,
            collection_ready: false,
            counters: BatchCounters::default(),
            progress: ProgressReporter::noop(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn counters(&self) -> BatchCounters {
        self.counters
    }

    /// Buffer one chunk, flushing when the buffer reaches `batch_size`.
    pub async fn push(&mut self, chunk: Chunk) -> AppResult<()> {
        self.buffer.push(chunk);
        self.counters.chunks_buffered += 1;

        if self.buffer.len() >= self.settings.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Buffer many chunks, flushing at every batch boundary.
    pub async fn extend(&mut self, chunks: impl IntoIterator<Item = Chunk>) -> AppResult<()> {
        for chunk in chunks {
            self.push(chunk).await?;
        }
        Ok(())
    }

    /// Buffer all chunks of one source document.
    pub async fn add_document(&mut self, chunks: Vec<Chunk>) -> AppResult<()> {
        self.extend(chunks).await?;
        self.counters.documents_processed += 1;
        Ok(())
    }

    /// Flush whatever is left and return the final counters.
    pub async fn finish(mut self) -> AppResult<BatchCounters> {
        if !self.buffer.is_empty() {
            self.flush().await?;
        }
        Ok(self.counters)
    }

    async fn flush(&mut self) -> AppResult<()> {
        let batch = std::mem::take(&mut self.buffer);
        if batch.is_empty() {
            return Ok(());
        }

        if !self.collection_ready {
            ensure_collection(
                self.index.as_ref(),
                &self.settings.collection,
                self.settings.dimension,
                self.settings.metric,
            )
            .await?;
            self.collection_ready = true;
        }

        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }

        let size = batch.len();
        let records: Vec<IndexRecord> = batch
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord {
                id: chunk.id,
                vector,
                text: chunk.text,
                metadata: chunk.metadata,
            })
            .collect();

        self.index
            .upsert(&self.settings.collection, records)
            .await?;

        self.counters.chunks_flushed += size as u64;
        self.counters.flushes += 1;

        tracing::debug!(
            collection = %self.settings.collection,
            batch = size,
            flushed = self.counters.chunks_flushed,
            "Flushed batch"
        );
        self.progress.flushed(self.counters.chunks_flushed, size);

        Ok(())
    }
}
