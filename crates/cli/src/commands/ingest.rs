//! Ingest command handler.

use clap::Args;
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_knowledge::services::build_ingestion_pipeline;
use docent_knowledge::{ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Ingest documents into the collection
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory to ingest (default: ingest.data_path)
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let data_path = config.resolve_path(
            self.data_path
                .as_deref()
                .unwrap_or(config.ingest.data_path.as_path()),
        );
        tracing::info!("Executing ingest command for {:?}", data_path);

        let mut pipeline = build_ingestion_pipeline(config).await?;
        if !self.json {
            pipeline = pipeline.with_progress(ProgressReporter::new(Arc::new(
                |event: ProgressEvent| eprintln!("{}", event.format_simple()),
            )));
        }

        let report = pipeline.run(&data_path).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!(
                "Ingested {} documents from {} files into '{}' ({} chunks in {} batches, {} files failed) in {:.2}s",
                report.documents_processed,
                report.files_loaded,
                report.collection,
                report.chunks_flushed,
                report.flushes,
                report.files_failed,
                report.duration_secs
            );
        }

        Ok(())
    }
}
