//! Score normalization and low-confidence classification.

use super::types::ConfidenceResult;
use docent_core::ScoreScale;

/// Collapse the raw scores of one query into a bounded confidence.
///
/// - No scores: `best_score` is `None` and the result is always low
///   confidence, whatever the threshold.
/// - `Similarity`: the best raw score is the maximum.
/// - `Distance`: the best raw score is `1 - min`.
/// - `Inferred`: `Similarity` when every score is at most 1.0, otherwise
///   `Distance`.
///
/// The best raw score is clamped into `[0, 1]`. With a threshold, results
/// below it are low confidence; without one, nothing is.
pub fn normalize_confidence(
    scores: &[f32],
    scale: ScoreScale,
    threshold: Option<f32>,
) -> ConfidenceResult {
    if scores.is_empty() {
        return ConfidenceResult {
            best_score: None,
            low_confidence: true,
        };
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);

    let raw_best = match scale {
        ScoreScale::Similarity => max,
        ScoreScale::Distance => 1.0 - min,
        ScoreScale::Inferred if max <= 1.0 => max,
        ScoreScale::Inferred => 1.0 - min,
    };
    let best_score = raw_best.clamp(0.0, 1.0);

    ConfidenceResult {
        best_score: Some(best_score),
        low_confidence: threshold.map(|t| best_score < t).unwrap_or(false),
    }
}
