//! Progress reporting for ingestion runs.
//!
//! The CLI prints these events; the pipeline itself only emits them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Stage of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    /// Walking the data directory
    Discover,
    /// Reading one file into documents
    Load,
    /// Splitting one file's documents into chunks
    Chunk,
    /// Embedding and writing one batch
    Flush,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestPhase::Discover => "discover",
            IngestPhase::Load => "load",
            IngestPhase::Chunk => "chunk",
            IngestPhase::Flush => "flush",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: IngestPhase,

    /// Work done so far in this phase (files, or chunks written)
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        })
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that forwards events to an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    fn emit(&self, phase: IngestPhase, current: u64, total: Option<u64>, message: String) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            "Progress event"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn discovered(&self, files: u64, root: &str) {
        self.emit(
            IngestPhase::Discover,
            files,
            Some(files),
            format!("found {} files under {}", files, root),
        );
    }

    pub fn loaded(&self, current: u64, total: u64, file: &str, documents: usize) {
        self.emit(
            IngestPhase::Load,
            current,
            Some(total),
            format!("{} ({} documents)", file, documents),
        );
    }

    pub fn chunked(&self, current: u64, total: u64, file: &str, chunks: usize) {
        self.emit(
            IngestPhase::Chunk,
            current,
            Some(total),
            format!("{} ({} chunks)", file, chunks),
        );
    }

    pub fn flushed(&self, chunks_flushed: u64, batch: usize) {
        self.emit(
            IngestPhase::Flush,
            chunks_flushed,
            None,
            format!("wrote batch of {}", batch),
        );
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_event_format() {
        let event = ProgressEvent {
            phase: IngestPhase::Chunk,
            current: 5,
            total: Some(10),
            message: "report.pdf (12 chunks)".to_string(),
            elapsed_secs: 0.5,
        };
        let formatted = event.format_simple();
        assert_eq!(formatted, "[chunk] 5/10 (50%) - report.pdf (12 chunks)");
    }

    #[test]
    fn test_reporter_forwards_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.discovered(3, "./data");
        reporter.flushed(32, 32);

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].phase, IngestPhase::Discover);
        assert_eq!(captured[1].phase, IngestPhase::Flush);
        assert_eq!(captured[1].current, 32);
        assert_eq!(captured[1].percentage(), None);
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().discovered(1, "test");
    }
}
