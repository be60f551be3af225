//! Ask command handler.
//!
//! Answers one question from the command line, or reads questions from
//! stdin until `exit` or `quit`.

use clap::Args;
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_knowledge::rag::RagMetrics;
use docent_knowledge::services::build_query_pipeline;
use docent_knowledge::{AnswerResult, QueryPipeline};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ask a question against the collection
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask; omit it for an interactive session
    pub question: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let pipeline = build_query_pipeline(config, Arc::new(RagMetrics::new())).await?;

        match self.question.as_deref().map(str::trim) {
            Some(question) if !question.is_empty() => {
                let result = pipeline.answer(question).await?;
                self.print(&result)
            }
            Some(_) => Err(AppError::Config("Question must not be empty".to_string())),
            None => self.interactive(&pipeline).await,
        }
    }

    /// Read questions line by line until EOF, `exit` or `quit`.
    ///
    /// A failed question is logged and the session continues.
    async fn interactive(&self, pipeline: &QueryPipeline) -> AppResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            if !self.json {
                print!("> ");
                std::io::stdout().flush()?;
            }

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();

            if question.is_empty() {
                continue;
            }
            if is_exit(question) {
                break;
            }

            match pipeline.answer(question).await {
                Ok(result) => self.print(&result)?,
                Err(e) => tracing::error!(error = %e, "Failed to answer question"),
            }
        }

        tracing::debug!("Interactive session ended");
        Ok(())
    }

    fn print(&self, result: &AnswerResult) -> AppResult<()> {
        if self.json {
            let output = serde_json::json!({
                "answer": result.answer,
                "retrieval_quality": result.retrieval_quality(),
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", result.answer);
            if result.low_confidence {
                tracing::warn!(
                    best_score = ?result.best_score,
                    "Retrieved excerpts were a weak match; the answer may not be grounded"
                );
            }
        }
        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
