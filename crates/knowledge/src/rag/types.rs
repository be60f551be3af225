//! Query result types.

use serde::{Deserialize, Serialize};

/// Confidence derived from one similarity query.
///
/// `best_score`, when present, is always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub best_score: Option<f32>,
    pub low_confidence: bool,
}

/// Outcome of one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub best_score: Option<f32>,
    pub low_confidence: bool,
}

impl AnswerResult {
    pub fn retrieval_quality(&self) -> RetrievalQuality {
        RetrievalQuality {
            best_score: self.best_score,
            low_confidence: self.low_confidence,
        }
    }
}

/// Retrieval quality as reported to HTTP and JSON CLI callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuality {
    pub best_score: Option<f32>,
    pub low_confidence: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_quality_serializes_null_score() {
        let result = AnswerResult {
            answer: "No idea.".to_string(),
            best_score: None,
            low_confidence: true,
        };
        let json = serde_json::to_value(result.retrieval_quality()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"best_score": null, "low_confidence": true})
        );
    }
}
