//! Configuration management for Docent.
//!
//! Configuration is layered, lowest to highest precedence:
//! - Built-in defaults
//! - Config file (`.docent/config.yaml` or `--config`)
//! - `DOCENT_*` environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with index state stored in `.docent/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const KNOWN_BACKENDS: [&str; 2] = ["sqlite", "lancedb"];
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["hashing", "ollama"];
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Distance metric a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::Dot => "dot",
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "dot" => Ok(DistanceMetric::Dot),
            other => Err(AppError::Config(format!(
                "Unknown distance metric: {}. Supported: cosine, l2, dot",
                other
            ))),
        }
    }
}

/// How raw scores returned by a similarity query should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreScale {
    /// Higher is better, nominally in `[0, 1]`.
    Similarity,
    /// Lower is better, unbounded above.
    Distance,
    /// Guess from the values: similarity when every score is `<= 1.0`.
    Inferred,
}

impl FromStr for ScoreScale {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "similarity" => Ok(ScoreScale::Similarity),
            "distance" => Ok(ScoreScale::Distance),
            "inferred" => Ok(ScoreScale::Inferred),
            other => Err(AppError::Config(format!(
                "Unknown score scale: {}. Supported: similarity, distance, inferred",
                other
            ))),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docent/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub prompt: PromptConfig,
    pub server: ServerConfig,
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// "sqlite" or "lancedb"
    pub backend: String,
    /// Storage location, relative paths resolve against the workspace
    pub path: PathBuf,
    pub collection_name: Option<String>,
    pub vector_dimension: usize,
    pub distance: DistanceMetric,
    /// Unset means "use the backend's native scale"
    pub score_scale: Option<ScoreScale>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: PathBuf::from(".docent/index"),
            collection_name: None,
            vector_dimension: 384,
            distance: DistanceMetric::Cosine,
            score_scale: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub retriever_k: usize,
    /// `None` disables low-confidence gating
    pub retrieval_score_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retriever_k: 4,
            retrieval_score_threshold: Some(0.3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub data_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub separators: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data"),
            chunk_size: 1000,
            chunk_overlap: 100,
            batch_size: 32,
            separators: default_separators(),
        }
    }
}

/// Heading markers first, then paragraphs, lines, words and characters.
pub fn default_separators() -> Vec<String> {
    ["\n# ", "\n## ", "\n### ", "\n\n", "\n", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hashing" (offline) or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "ollama" or "openai" (any OpenAI-compatible chat endpoint)
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            temperature: 0.1,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// YAML prompt definition replacing the built-in template
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    index: Option<IndexConfig>,
    retrieval: Option<RetrievalConfig>,
    ingest: Option<IngestConfig>,
    embedding: Option<EmbeddingConfig>,
    llm: Option<LlmConfig>,
    prompt: Option<PromptConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingest: IngestConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            prompt: PromptConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// # Example
    /// ```no_run
    /// use docent_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `DOCENT_WORKSPACE` and `DOCENT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("DOCENT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("DOCENT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if config_file.is_some() {
            config.config_file = config_file;
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docent_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Sections default field-by-field, so a partial section keeps the
        // built-in values for whatever it omits.
        if let Some(index) = config_file.index {
            result.index = index;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(ingest) = config_file.ingest {
            result.ingest = ingest;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(prompt) = config_file.prompt {
            result.prompt = prompt;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply `DOCENT_*` overrides read through `lookup`.
    fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("DOCENT_COLLECTION_NAME") {
            self.index.collection_name = Some(name);
        }
        if let Some(backend) = lookup("DOCENT_INDEX_BACKEND") {
            self.index.backend = backend;
        }
        if let Some(path) = lookup("DOCENT_INDEX_PATH") {
            self.index.path = PathBuf::from(path);
        }
        if let Some(dim) = lookup("DOCENT_VECTOR_DIMENSION") {
            self.index.vector_dimension = parse_env("DOCENT_VECTOR_DIMENSION", &dim)?;
        }
        if let Some(k) = lookup("DOCENT_RETRIEVER_K") {
            self.retrieval.retriever_k = parse_env("DOCENT_RETRIEVER_K", &k)?;
        }
        if let Some(threshold) = lookup("DOCENT_RETRIEVAL_SCORE_THRESHOLD") {
            self.retrieval.retrieval_score_threshold = parse_threshold(&threshold)?;
        }
        if let Some(path) = lookup("DOCENT_DATA_PATH") {
            self.ingest.data_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("DOCENT_CHUNK_SIZE") {
            self.ingest.chunk_size = parse_env("DOCENT_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("DOCENT_CHUNK_OVERLAP") {
            self.ingest.chunk_overlap = parse_env("DOCENT_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(batch) = lookup("DOCENT_BATCH_SIZE") {
            self.ingest.batch_size = parse_env("DOCENT_BATCH_SIZE", &batch)?;
        }
        if let Some(provider) = lookup("DOCENT_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("DOCENT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(provider) = lookup("DOCENT_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("DOCENT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = lookup("DOCENT_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("DOCENT_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(bind) = lookup("DOCENT_BIND") {
            self.server.bind = bind;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the config file and environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        collection_name: Option<String>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(name) = collection_name {
            self.index.collection_name = Some(name);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docent directory.
    pub fn docent_dir(&self) -> PathBuf {
        self.workspace.join(".docent")
    }

    /// Ensure the .docent directory exists.
    pub fn ensure_docent_dir(&self) -> AppResult<()> {
        let docent_dir = self.docent_dir();
        if !docent_dir.exists() {
            std::fs::create_dir_all(&docent_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docent directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// The collection name, or a configuration error when it is missing.
    pub fn collection_name(&self) -> AppResult<&str> {
        match self.index.collection_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(AppError::Config(
                "collection_name is required (set index.collection_name or DOCENT_COLLECTION_NAME)"
                    .to_string(),
            )),
        }
    }

    /// Resolve the generation API key: `DOCENT_API_KEY` first, then `llm.api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        self.llm
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }

    /// Validate the configuration before anything starts.
    pub fn validate(&self) -> AppResult<()> {
        self.collection_name()?;

        if !KNOWN_BACKENDS.contains(&self.index.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown index backend: {}. Supported: {}",
                self.index.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }

        if self.index.vector_dimension == 0 {
            return Err(AppError::Config(
                "vector_dimension must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.retriever_k == 0 {
            return Err(AppError::Config(
                "retriever_k must be greater than 0".to_string(),
            ));
        }

        if let Some(threshold) = self.retrieval.retrieval_score_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(AppError::Config(format!(
                    "retrieval_score_threshold must be within [0, 1], got {}",
                    threshold
                )));
            }
        }

        if self.ingest.chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }

        if self.ingest.batch_size == 0 {
            return Err(AppError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid value for {}: {:?}", key, value)))
}

/// `none`, `null` or an empty string disable the threshold.
fn parse_threshold(value: &str) -> AppResult<Option<f32>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "null" => Ok(None),
        _ => parse_env("DOCENT_RETRIEVAL_SCORE_THRESHOLD", value).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.index.collection_name = Some("manuals".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.retrieval.retriever_k, 4);
        assert_eq!(config.retrieval.retrieval_score_threshold, Some(0.3));
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.ingest.chunk_overlap, 100);
        assert_eq!(config.ingest.batch_size, 32);
        assert_eq!(config.ingest.separators.last().map(String::as_str), Some(""));
        assert!(!config.verbose);
    }

    #[test]
    fn test_docent_dir() {
        let config = AppConfig::default();
        assert!(config.docent_dir().ends_with(".docent"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            Some("docs".to_string()),
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.index.collection_name.as_deref(), Some("docs"));
        assert_eq!(overridden.llm.provider, "openai");
        assert_eq!(overridden.llm.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_requires_collection_name() {
        let mut config = AppConfig::default();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.index.collection_name = Some("   ".to_string());
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.index.collection_name = Some("manuals".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut config = valid_config();
        config.retrieval.retriever_k = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.ingest.chunk_overlap = config.ingest.chunk_size;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.retrieval.retrieval_score_threshold = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.retrieval.retrieval_score_threshold = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_names() {
        let mut config = valid_config();
        config.index.backend = "pinecone".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_partial_section_keeps_defaults() {
        let yaml = r#"
index:
  collection_name: handbook
  backend: lancedb
retrieval:
  retriever_k: 6
"#;
        let config = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(config.index.collection_name.as_deref(), Some("handbook"));
        assert_eq!(config.index.backend, "lancedb");
        assert_eq!(config.index.vector_dimension, 384);
        assert_eq!(config.retrieval.retriever_k, 6);
        assert_eq!(config.retrieval.retrieval_score_threshold, Some(0.3));
    }

    #[test]
    fn test_yaml_null_threshold_disables_gating() {
        let yaml = "retrieval:\n  retrieval_score_threshold: null\n";
        let config = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(config.retrieval.retrieval_score_threshold, None);
    }

    #[test]
    fn test_yaml_score_scale() {
        let yaml = "index:\n  distance: l2\n  score_scale: distance\n";
        let config = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(config.index.distance, DistanceMetric::L2);
        assert_eq!(config.index.score_scale, Some(ScoreScale::Distance));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DOCENT_COLLECTION_NAME", "faq"),
            ("DOCENT_RETRIEVER_K", "8"),
            ("DOCENT_RETRIEVAL_SCORE_THRESHOLD", "none"),
            ("DOCENT_BATCH_SIZE", "16"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.index.collection_name.as_deref(), Some("faq"));
        assert_eq!(config.retrieval.retriever_k, 8);
        assert_eq!(config.retrieval.retrieval_score_threshold, None);
        assert_eq!(config.ingest.batch_size, 16);
    }

    #[test]
    fn test_env_rejects_non_numeric() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| {
            (key == "DOCENT_CHUNK_SIZE").then(|| "large".to_string())
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_load_from_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".docent")).unwrap();
        std::fs::write(
            dir.path().join(".docent/config.yaml"),
            "index:\n  collection_name: from_file\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), None).unwrap();
        assert!(config.index.collection_name.is_some());
        assert!(config.resolve_path(Path::new("data")).starts_with(dir.path()));
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from(
            Some(dir.path().to_path_buf()),
            Some(dir.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
