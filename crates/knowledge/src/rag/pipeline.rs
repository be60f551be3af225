//! Question answering: retrieve → assess confidence → build context → generate.

use super::confidence::normalize_confidence;
use super::context::assemble_context;
use super::metrics::RagMetrics;
use super::types::AnswerResult;
use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievedDocument;
use crate::vector_index::VectorIndex;
use docent_core::{AppResult, DistanceMetric, ScoreScale};
use docent_llm::{ChatMessage, LlmClient, LlmRequest};
use docent_prompt::{build_prompt, PromptDefinition};
use std::fmt;
use std::sync::Arc;

/// Per-pipeline query settings.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub collection: String,
    /// Number of nearest chunks to retrieve
    pub k: usize,
    /// Best scores below this are low confidence; `None` disables gating
    pub threshold: Option<f32>,
    /// Overrides the index's native score scale when set
    pub score_scale: Option<ScoreScale>,
    pub metric: DistanceMetric,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Stage of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Retrieving,
    ContextBuilt,
    Generating,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Retrieving => "retrieving",
            Stage::ContextBuilt => "context_built",
            Stage::Generating => "generating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Answers questions against one collection.
///
/// Holds only shared, long-lived collaborators; every call to
/// [`QueryPipeline::answer`] keeps its state on its own stack, so one
/// instance can serve concurrent requests. Errors from any stage are
/// recorded and returned unchanged. Nothing is retried.
pub struct QueryPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: QuerySettings,
    scale: ScoreScale,
    metrics: Arc<RagMetrics>,
}

impl QueryPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: QuerySettings,
        metrics: Arc<RagMetrics>,
    ) -> Self {
        let scale = settings
            .score_scale
            .unwrap_or_else(|| index.native_score_scale(settings.metric));

        tracing::debug!(
            backend = index.backend_name(),
            collection = %settings.collection,
            ?scale,
            "Query pipeline ready"
        );

        Self {
            index,
            embedder,
            llm,
            prompt,
            settings,
            scale,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<RagMetrics> {
        &self.metrics
    }

    /// Score scale used to read the index's raw scores.
    pub fn score_scale(&self) -> ScoreScale {
        self.scale
    }

    /// Answer one question.
    pub async fn answer(&self, question: &str) -> AppResult<AnswerResult> {
        let _request_timer = self.metrics.time_request();
        enter(Stage::Start);

        match self.run(question).await {
            Ok(result) => {
                self.metrics.record_success();
                enter(Stage::Done);
                tracing::info!(
                    best_score = ?result.best_score,
                    low_confidence = result.low_confidence,
                    "Answered question"
                );
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_error();
                tracing::warn!(stage = %Stage::Failed, error = %e, "Query failed");
                Err(e)
            }
        }
    }

    async fn run(&self, question: &str) -> AppResult<AnswerResult> {
        enter(Stage::Retrieving);
        let pairs = self.retrieve(question).await?;
        self.metrics.record_retrieved(pairs.len());

        let (documents, scores): (Vec<RetrievedDocument>, Vec<f32>) = pairs.into_iter().unzip();
        let confidence = normalize_confidence(&scores, self.scale, self.settings.threshold);
        self.metrics
            .record_confidence(confidence.best_score, confidence.low_confidence);

        let context = assemble_context(&documents);
        let prompt = build_prompt(&self.prompt, &context, question)?;

        tracing::debug!(
            stage = %Stage::ContextBuilt,
            documents = documents.len(),
            best_score = ?confidence.best_score,
            low_confidence = confidence.low_confidence,
            context_chars = prompt.metadata.context_chars,
            "Query stage"
        );
        tracing::trace!("Context: {}", context);

        enter(Stage::Generating);
        let mut request = LlmRequest::new(
            vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
            self.settings.model.clone(),
        );
        if let Some(temperature) = self.settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = {
            let _llm_timer = self.metrics.time_llm();
            self.llm.complete(&request).await?
        };

        Ok(AnswerResult {
            answer: response.content,
            best_score: confidence.best_score,
            low_confidence: confidence.low_confidence,
        })
    }

    async fn retrieve(&self, question: &str) -> AppResult<Vec<(RetrievedDocument, f32)>> {
        let _retrieval_timer = self.metrics.time_retrieval();
        let vector = self.embedder.embed(question).await?;
        self.index
            .query_similar(&self.settings.collection, &vector, self.settings.k)
            .await
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "Query stage");
}
