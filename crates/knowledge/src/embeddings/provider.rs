//! Embedding provider trait and factory.

use super::providers::{hashing::HashingProvider, ollama::OllamaProvider};
use docent_core::config::EmbeddingConfig;
use docent_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Vectors returned by one provider instance always have
/// [`EmbeddingProvider::dimensions`] entries.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "hashing", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, one vector per text, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider producing `dimensions`-long vectors.
pub fn create_provider(
    config: &EmbeddingConfig,
    dimensions: usize,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingProvider::new(dimensions))),

        "ollama" => {
            let provider =
                OllamaProvider::new(config.endpoint.as_deref(), &config.model, dimensions)?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: hashing, ollama",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_provider() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config, 64).unwrap();
        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn test_create_ollama_provider_uses_model() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: Some("http://localhost:11434".to_string()),
        };
        let provider = create_provider(&config, 768).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..Default::default()
        };

        let result = create_provider(&config, 384);
        assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.contains("Unknown embedding provider")));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::default(), 384).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
