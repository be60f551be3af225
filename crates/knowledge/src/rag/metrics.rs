//! Query pipeline metrics.
//!
//! Counters and histograms are plain atomics so concurrent requests never
//! lose updates. [`RagMetrics::render`] produces the Prometheus text
//! exposition format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const RETRIEVAL_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
const LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 60.0];
const DOCUMENT_BUCKETS: &[f64] = &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 10.0, 15.0, 20.0];
const SCORE_BUCKETS: &[f64] = &[0.0, 0.2, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0];

/// Fixed-bucket histogram with cumulative rendering.
#[derive(Debug)]
pub struct Histogram {
    name: &'static str,
    help: &'static str,
    bounds: &'static [f64],
    /// One slot per bound plus the `+Inf` overflow slot
    counts: Vec<AtomicU64>,
    /// Sum of observations, stored as `f64` bits
    sum: AtomicU64,
}

impl Histogram {
    fn new(name: &'static str, help: &'static str, bounds: &'static [f64]) -> Self {
        Self {
            name,
            help,
            bounds,
            counts: (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn observe(&self, value: f64) {
        let slot = self
            .bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bounds.len());
        self.counts[slot].fetch_add(1, Ordering::Relaxed);

        // fetch_update only fails when the closure returns None
        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    pub fn count(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} histogram", self.name);

        let mut cumulative = 0;
        for (bound, count) in self.bounds.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{le=\"{}\"}} {}", self.name, bound, cumulative);
        }
        cumulative += self.counts[self.bounds.len()].load(Ordering::Relaxed);
        let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", self.name, cumulative);
        let _ = writeln!(out, "{}_sum {}", self.name, self.sum());
        let _ = writeln!(out, "{}_count {}", self.name, cumulative);
    }
}

/// Observes elapsed seconds into a histogram when dropped.
#[must_use = "the timer records when dropped"]
pub struct Timer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Aggregate metrics shared by every request of one query pipeline.
#[derive(Debug)]
pub struct RagMetrics {
    requests_success: AtomicU64,
    requests_error: AtomicU64,
    low_confidence: AtomicU64,
    pub retrieval_duration: Histogram,
    pub llm_duration: Histogram,
    pub request_duration: Histogram,
    pub documents_retrieved: Histogram,
    pub best_score: Histogram,
}

impl Default for RagMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RagMetrics {
    pub fn new() -> Self {
        Self {
            requests_success: AtomicU64::new(0),
            requests_error: AtomicU64::new(0),
            low_confidence: AtomicU64::new(0),
            retrieval_duration: Histogram::new(
                "rag_retrieval_duration_seconds",
                "Time spent retrieving documents from the vector index",
                RETRIEVAL_BUCKETS,
            ),
            llm_duration: Histogram::new(
                "rag_llm_duration_seconds",
                "Time spent in LLM generation",
                LATENCY_BUCKETS,
            ),
            request_duration: Histogram::new(
                "rag_request_duration_seconds",
                "Total RAG request duration (retrieval + LLM)",
                LATENCY_BUCKETS,
            ),
            documents_retrieved: Histogram::new(
                "rag_documents_retrieved",
                "Number of documents retrieved per request",
                DOCUMENT_BUCKETS,
            ),
            best_score: Histogram::new(
                "rag_retrieval_best_score",
                "Best normalized retrieval score per request",
                SCORE_BUCKETS,
            ),
        }
    }

    pub fn time_request(&self) -> Timer<'_> {
        Self::timer(&self.request_duration)
    }

    pub fn time_retrieval(&self) -> Timer<'_> {
        Self::timer(&self.retrieval_duration)
    }

    pub fn time_llm(&self) -> Timer<'_> {
        Self::timer(&self.llm_duration)
    }

    fn timer(histogram: &Histogram) -> Timer<'_> {
        Timer {
            histogram,
            start: Instant::now(),
        }
    }

    pub fn record_retrieved(&self, count: usize) {
        self.documents_retrieved.observe(count as f64);
    }

    /// Record the confidence of one request.
    ///
    /// Only requests that retrieved something are recorded; an empty result
    /// has no score and is not counted as low confidence.
    pub fn record_confidence(&self, best_score: Option<f32>, low_confidence: bool) {
        let Some(score) = best_score else {
            return;
        };
        self.best_score.observe(score as f64);
        if low_confidence {
            self.low_confidence.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.requests_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_success(&self) -> u64 {
        self.requests_success.load(Ordering::Relaxed)
    }

    pub fn requests_error(&self) -> u64 {
        self.requests_error.load(Ordering::Relaxed)
    }

    pub fn low_confidence_total(&self) -> u64 {
        self.low_confidence.load(Ordering::Relaxed)
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP rag_requests_total Total RAG requests");
        let _ = writeln!(out, "# TYPE rag_requests_total counter");
        let _ = writeln!(
            out,
            "rag_requests_total{{status=\"success\"}} {}",
            self.requests_success()
        );
        let _ = writeln!(
            out,
            "rag_requests_total{{status=\"error\"}} {}",
            self.requests_error()
        );

        let _ = writeln!(
            out,
            "# HELP rag_retrieval_low_confidence_total Requests flagged as low confidence"
        );
        let _ = writeln!(out, "# TYPE rag_retrieval_low_confidence_total counter");
        let _ = writeln!(
            out,
            "rag_retrieval_low_confidence_total {}",
            self.low_confidence_total()
        );

        for histogram in [
            &self.retrieval_duration,
            &self.llm_duration,
            &self.request_duration,
            &self.documents_retrieved,
            &self.best_score,
        ] {
            histogram.render(&mut out);
        }

        out
    }
}
