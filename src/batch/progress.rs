use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::ProgressBar;

use super::{BatchItemStatus, BatchPhase, BatchSummary};

/// Counters after one processed item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub phase: BatchPhase,
    pub last: Option<(String, BatchItemStatus)>,
}

impl BatchProgress {
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u64
    }
}

/// Receives batch progress. Called from the pipeline task and from the
/// elapsed-time ticker task.
pub trait ProgressSink: Send + Sync {
    fn on_start(&self, _total: usize) {}
    fn on_progress(&self, progress: &BatchProgress);
    fn on_elapsed(&self, elapsed: Duration);
    fn on_finish(&self, _summary: &BatchSummary) {}
}

impl ProgressSink for ProgressBar {
    fn on_start(&self, total: usize) {
        self.set_length(total.max(1) as u64);
        self.set_position(0);
        self.set_prefix("0s");
    }

    fn on_progress(&self, progress: &BatchProgress) {
        self.set_position(progress.processed as u64);
        self.set_message(format!(
            "found {} :: not found {}",
            progress.found, progress.not_found
        ));
        if let Some((id, status)) = &progress.last {
            let label = match status {
                BatchItemStatus::Found => status.label().green(),
                BatchItemStatus::InvalidFormat { .. } => status.label().yellow(),
                _ => status.label().red(),
            };
            self.println(format!(":: {:<16}: {}", id, label));
        }
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.set_prefix(format!("{}s", elapsed.as_secs()));
    }

    fn on_finish(&self, _summary: &BatchSummary) {
        self.finish_and_clear();
    }
}

/// Keeps every progress event; used where no terminal is attached.
#[derive(Debug, Default)]
pub struct RecordingSink {
    progress: Mutex<Vec<BatchProgress>>,
    ticks: Mutex<Vec<Duration>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<BatchProgress> {
        self.progress
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn ticks(&self) -> Vec<Duration> {
        self.ticks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, progress: &BatchProgress) {
        if let Ok(mut p) = self.progress.lock() {
            p.push(progress.clone());
        }
    }

    fn on_elapsed(&self, elapsed: Duration) {
        if let Ok(mut t) = self.ticks.lock() {
            t.push(elapsed);
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _progress: &BatchProgress) {}
    fn on_elapsed(&self, _elapsed: Duration) {}
}
