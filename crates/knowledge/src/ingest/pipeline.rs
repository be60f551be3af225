//! Ingestion: files → documents → chunks → vectors in the index.

use super::batch::{BatchUpserter, UpsertSettings};
use super::discovery::discover_files;
use super::loader::DocumentLoader;
use crate::chunk::ChunkSplitter;
use crate::embeddings::EmbeddingProvider;
use crate::progress::ProgressReporter;
use crate::types::IngestReport;
use crate::vector_index::VectorIndex;
use docent_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Log a progress line every this many documents.
const LOG_EVERY_DOCUMENTS: u64 = 10;

/// Drives discovery, loading, splitting and batched upserts for one data
/// directory.
///
/// A file that fails to load is logged, counted in `files_failed` and
/// skipped. Embedding and index failures abort the run.
pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    loader: Arc<dyn DocumentLoader>,
    splitter: ChunkSplitter,
    settings: UpsertSettings,
    progress: ProgressReporter,
}

impl IngestionPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        loader: Arc<dyn DocumentLoader>,
        splitter: ChunkSplitter,
        settings: UpsertSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            loader,
            splitter,
            settings,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, data_path: &Path) -> AppResult<IngestReport> {
        let started = Instant::now();
        let mut report = IngestReport::empty(&self.settings.collection);

        if !data_path.exists() {
            std::fs::create_dir_all(data_path)?;
            tracing::warn!(
                "Data directory {:?} did not exist; created it. Add documents and run ingest again",
                data_path
            );
            report.duration_secs = started.elapsed().as_secs_f64();
            return Ok(report);
        }

        let root = data_path.to_path_buf();
        let files = tokio::task::spawn_blocking(move || discover_files(&root))
            .await
            .map_err(|e| AppError::Other(format!("File discovery task failed: {}", e)))?;

        let total = files.len() as u64;
        report.files_discovered = total;
        self.progress
            .discovered(total, &data_path.to_string_lossy());
        tracing::info!(
            collection = %self.settings.collection,
            files = total,
            "Starting ingestion from {:?}",
            data_path
        );

        let mut upserter = BatchUpserter::new(
            self.index.clone(),
            self.embedder.clone(),
            self.settings.clone(),
        )?
        .with_progress(self.progress.clone());

        for (i, path) in files.into_iter().enumerate() {
            let current = i as u64 + 1;
            let display_path = path.to_string_lossy().to_string();

            let loader = self.loader.clone();
            let load_path = path.clone();
            let loaded = tokio::task::spawn_blocking(move || loader.load(&load_path))
                .await
                .map_err(|e| AppError::Other(format!("Loader task failed: {}", e)))?;

            let documents = match loaded {
                Ok(documents) => documents,
                Err(e) => {
                    tracing::warn!(file = %display_path, error = %e, "Skipping file that failed to load");
                    report.files_failed += 1;
                    continue;
                }
            };
            report.files_loaded += 1;
            self.progress
                .loaded(current, total, &display_path, documents.len());

            let mut file_chunks = 0;
            for document in &documents {
                let chunks = self.splitter.split_document(document);
                file_chunks += chunks.len();
                upserter.add_document(chunks).await?;

                let processed = upserter.counters().documents_processed;
                if processed % LOG_EVERY_DOCUMENTS == 0 {
                    tracing::info!(
                        documents = processed,
                        chunks = upserter.counters().chunks_buffered,
                        "Ingestion progress"
                    );
                }
            }
            self.progress.chunked(current, total, &display_path, file_chunks);
        }

        let counters = upserter.finish().await?;
        report.documents_processed = counters.documents_processed;
        report.chunks_buffered = counters.chunks_buffered;
        report.chunks_flushed = counters.chunks_flushed;
        report.flushes = counters.flushes;
        report.duration_secs = started.elapsed().as_secs_f64();

        tracing::info!(
            collection = %report.collection,
            files_loaded = report.files_loaded,
            files_failed = report.files_failed,
            documents = report.documents_processed,
            chunks = report.chunks_flushed,
            flushes = report.flushes,
            duration_secs = report.duration_secs,
            "Ingestion complete"
        );

        Ok(report)
    }
}
