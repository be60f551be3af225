//! Wiring: build the shared collaborators and pipelines from configuration.
//!
//! Everything here runs once at startup. Failures are configuration errors
//! and must stop the process before it serves anything.

use crate::chunk::ChunkSplitter;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::ingest::{ensure_collection, FileLoader, IngestionPipeline, UpsertSettings};
use crate::lancedb_index::LanceDbIndex;
use crate::rag::{QueryPipeline, QuerySettings, RagMetrics};
use crate::sqlite_index::SqliteIndex;
use crate::vector_index::VectorIndex;
use docent_core::{AppConfig, AppError, AppResult};
use docent_llm::LlmClient;
use std::sync::Arc;

/// SQLite database file inside `index.path`.
const SQLITE_FILE: &str = "docent.sqlite3";

/// Open the configured vector index backend.
pub async fn build_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    let path = config.resolve_path(&config.index.path);

    match config.index.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteIndex::open(&path.join(SQLITE_FILE))?)),
        "lancedb" => Ok(Arc::new(
            LanceDbIndex::connect(&path, config.index.distance).await?,
        )),
        other => Err(AppError::Config(format!("Unknown index backend: {}", other))),
    }
}

/// Create the embedding provider and check it produces `vector_dimension`-long vectors.
pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let dimension = config.index.vector_dimension;
    let embedder = create_provider(&config.embedding, dimension)?;

    if embedder.dimensions() != dimension {
        return Err(AppError::Config(format!(
            "Embedding provider '{}' produces {}-dimensional vectors but vector_dimension is {}",
            embedder.provider_name(),
            embedder.dimensions(),
            dimension
        )));
    }

    tracing::debug!(
        provider = embedder.provider_name(),
        model = embedder.model_name(),
        dimension,
        "Embedding provider ready"
    );
    Ok(embedder)
}

pub fn build_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = config.resolve_api_key();
    docent_llm::create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        api_key.as_deref(),
    )
}

pub fn query_settings(config: &AppConfig) -> AppResult<QuerySettings> {
    Ok(QuerySettings {
        collection: config.collection_name()?.to_string(),
        k: config.retrieval.retriever_k,
        threshold: config.retrieval.retrieval_score_threshold,
        score_scale: config.index.score_scale,
        metric: config.index.distance,
        model: config.llm.model.clone(),
        temperature: Some(config.llm.temperature),
        max_tokens: config.llm.max_tokens,
    })
}

pub fn upsert_settings(config: &AppConfig) -> AppResult<UpsertSettings> {
    Ok(UpsertSettings {
        collection: config.collection_name()?.to_string(),
        dimension: config.index.vector_dimension,
        metric: config.index.distance,
        batch_size: config.ingest.batch_size,
    })
}

/// Build the query pipeline, asserting the collection's dimension when it
/// already exists.
pub async fn build_query_pipeline(
    config: &AppConfig,
    metrics: Arc<RagMetrics>,
) -> AppResult<QueryPipeline> {
    let settings = query_settings(config)?;
    let index = build_index(config).await?;
    let embedder = build_embedder(config)?;
    let llm = build_llm(config)?;

    let prompt_file = config.prompt.file.as_ref().map(|p| config.resolve_path(p));
    let prompt = docent_prompt::load_prompt(prompt_file.as_deref())?;

    if let Some(existing) = index.collection_dimension(&settings.collection).await? {
        if existing != config.index.vector_dimension {
            return Err(AppError::Config(format!(
                "Collection '{}' stores {}-dimensional vectors but vector_dimension is {}",
                settings.collection, existing, config.index.vector_dimension
            )));
        }
    } else {
        tracing::warn!(
            collection = %settings.collection,
            "Collection does not exist yet; queries will fail until documents are ingested"
        );
    }

    Ok(QueryPipeline::new(
        index, embedder, llm, prompt, settings, metrics,
    ))
}

pub async fn build_ingestion_pipeline(config: &AppConfig) -> AppResult<IngestionPipeline> {
    let settings = upsert_settings(config)?;
    let splitter = ChunkSplitter::new(
        config.ingest.chunk_size,
        config.ingest.chunk_overlap,
        config.ingest.separators.clone(),
    )?;
    let index = build_index(config).await?;
    let embedder = build_embedder(config)?;

    Ok(IngestionPipeline::new(
        index,
        embedder,
        Arc::new(FileLoader::new()),
        splitter,
        settings,
    ))
}

/// Create the configured collection if needed. Returns `true` when it was created.
pub async fn init_collection(config: &AppConfig) -> AppResult<bool> {
    let settings = upsert_settings(config)?;
    let index = build_index(config).await?;
    ensure_collection(
        index.as_ref(),
        &settings.collection,
        settings.dimension,
        settings.metric,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::config::IndexConfig;
    use tempfile::TempDir;

    fn config(workspace: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = workspace.to_path_buf();
        config.index = IndexConfig {
            collection_name: Some("docs".to_string()),
            vector_dimension: 16,
            ..IndexConfig::default()
        };
        config
    }

    #[tokio::test]
    async fn test_init_collection_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        assert!(init_collection(&config).await.unwrap());
        assert!(!init_collection(&config).await.unwrap());
        assert!(dir.path().join(".docent/index").join(SQLITE_FILE).exists());
    }

    #[tokio::test]
    async fn test_dimension_change_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        init_collection(&config).await.unwrap();

        config.index.vector_dimension = 32;
        assert!(matches!(
            init_collection(&config).await,
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            build_query_pipeline(&config, Arc::new(RagMetrics::new())).await,
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_collection_name_is_config_error() {
        let mut config = AppConfig::default();
        config.index.collection_name = None;
        assert!(matches!(query_settings(&config), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_query_settings_follow_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.retrieval.retrieval_score_threshold = None;

        let settings = query_settings(&config).unwrap();
        assert_eq!(settings.collection, "docs");
        assert_eq!(settings.k, 4);
        assert_eq!(settings.threshold, None);

        let pipeline = build_query_pipeline(&config, Arc::new(RagMetrics::new()))
            .await
            .unwrap();
        assert_eq!(pipeline.score_scale(), docent_core::ScoreScale::Similarity);
    }
}
