//! Serve command handler.
//!
//! Exposes one shared [`QueryPipeline`] over HTTP:
//! - `POST /ask` answers `{question}` with `{answer, retrieval_quality}`
//! - `GET /metrics` renders the request metrics for scraping

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::Args;
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_knowledge::rag::RagMetrics;
use docent_knowledge::services::build_query_pipeline;
use docent_knowledge::{QueryPipeline, RetrievalQuality};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serve the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to listen on (default: server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub retrieval_quality: Option<RetrievalQuality>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let bind = self.bind.clone().unwrap_or_else(|| config.server.bind.clone());

        let metrics = Arc::new(RagMetrics::new());
        let pipeline = Arc::new(build_query_pipeline(config, metrics).await?);
        let router = build_router(pipeline);

        let listener = TcpListener::bind(&bind).await?;
        tracing::info!("Listening on {}", bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

pub fn build_router(pipeline: Arc<QueryPipeline>) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/metrics", get(metrics))
        .with_state(pipeline)
}

async fn ask(
    State(pipeline): State<Arc<QueryPipeline>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "question must not be empty"));
    }

    match pipeline.answer(question).await {
        Ok(result) => Ok(Json(AskResponse {
            retrieval_quality: Some(result.retrieval_quality()),
            answer: result.answer,
        })),
        Err(e) => Err(api_error(error_status(&e), e.to_string())),
    }
}

async fn metrics(State(pipeline): State<Arc<QueryPipeline>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        pipeline.metrics().render(),
    )
}

fn error_status(error: &AppError) -> StatusCode {
    match error {
        AppError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_backend() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
