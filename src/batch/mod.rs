pub mod progress;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::history::Journal;
use crate::normalizer::normalize;
use crate::record::{LookupResult, RecordType, Verdict};
use crate::report::{self, ReportContext};
use crate::utils;

pub use progress::{BatchProgress, NullSink, ProgressSink, RecordingSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Validating,
    Fetching(usize),
    Aggregating,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchItemStatus {
    Found,
    NotFound,
    InvalidResponse,
    NetworkError(String),
    InvalidFormat { expected: String },
}

impl BatchItemStatus {
    pub fn label(&self) -> String {
        match self {
            BatchItemStatus::Found => "DATA FOUND".to_string(),
            BatchItemStatus::NotFound => "DATA NOT FOUND".to_string(),
            BatchItemStatus::InvalidResponse => "INVALID RESPONSE FORMAT".to_string(),
            BatchItemStatus::NetworkError(_) => "NETWORK ERROR".to_string(),
            BatchItemStatus::InvalidFormat { expected } => {
                format!("INVALID FORMAT (Expected {expected})")
            }
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, BatchItemStatus::Found)
    }

    fn from_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Found => BatchItemStatus::Found,
            Verdict::Malformed => BatchItemStatus::InvalidResponse,
            Verdict::NotFound | Verdict::TransportError => BatchItemStatus::NotFound,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchItem {
    pub identifier: String,
    pub status: BatchItemStatus,
    pub result: Option<LookupResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchSummary {
    pub record_type: RecordType,
    pub total: usize,
    pub found: Vec<String>,
    pub not_found: Vec<String>,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Percentage of found identifiers; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.found.len() as f64 / self.total as f64 * 100.0
    }

    pub fn success_rate_label(&self) -> String {
        format!("{:.2}%", self.success_rate())
    }
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub report: String,
    pub items: Vec<BatchItem>,
}

/// Pacing for a batch run.
#[derive(Clone, Copy, Debug)]
pub struct BatchPolicy {
    /// Upper bound on lookups per second; unbounded when `None`.
    pub rate: Option<NonZeroU32>,
    /// Period of the elapsed-time ticker.
    pub tick: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            rate: None,
            tick: Duration::from_secs(1),
        }
    }
}

/// Sequential lookups over a list of identifiers.
///
/// One run at a time per pipeline. Starting a run cancels the ticker of the
/// previous one if it is still alive.
pub struct BatchPipeline {
    transport: Arc<dyn crate::transport::LookupTransport>,
    journal: Journal,
    data_source: String,
    policy: BatchPolicy,
    sink: Arc<dyn ProgressSink>,
    phase: BatchPhase,
    ticker: Option<JoinHandle<()>>,
}

impl BatchPipeline {
    pub fn new(
        transport: Arc<dyn crate::transport::LookupTransport>,
        journal: Journal,
        data_source: &str,
        policy: BatchPolicy,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            transport,
            journal,
            data_source: data_source.to_string(),
            policy,
            sink,
            phase: BatchPhase::Idle,
            ticker: None,
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn set_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.sink = sink;
    }

    fn start_ticker(&mut self, started: Instant) {
        if self.stop_ticker() {
            debug!("previous batch ticker canceled");
        }
        let sink = self.sink.clone();
        let period = self.policy.tick.max(Duration::from_millis(1));
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(started + period, period);
            loop {
                interval.tick().await;
                sink.on_elapsed(started.elapsed());
            }
        }));
    }

    /// Returns `true` when a live ticker was canceled.
    fn stop_ticker(&mut self) -> bool {
        match self.ticker.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub async fn run(&mut self, identifiers: &[String], record_type: RecordType) -> BatchOutcome {
        let started = Instant::now();
        let total = identifiers.len();
        let ctx = ReportContext::now(&self.data_source);
        info!(%record_type, total, "batch run started");

        self.sink.on_start(total);
        self.start_ticker(started);

        let limiter = self
            .policy
            .rate
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        let mut text = report::format_batch_header(record_type, total, &ctx);
        text.push('\n');
        let mut items = Vec::with_capacity(total);
        let mut found: Vec<String> = Vec::new();
        let mut not_found: Vec<String> = Vec::new();
        let mut attempts = 0u64;
        let mut latency_ms = 0u64;

        for (idx, identifier) in identifiers.iter().enumerate() {
            self.phase = BatchPhase::Validating;
            let item = if let Err(e) = utils::validate_identifier(record_type, identifier) {
                debug!(identifier = %identifier, error = %e, "skipping invalid identifier");
                BatchItem {
                    identifier: identifier.clone(),
                    status: BatchItemStatus::InvalidFormat {
                        expected: utils::expectation(record_type),
                    },
                    result: None,
                }
            } else {
                self.phase = BatchPhase::Fetching(idx);
                if let Some(limiter) = limiter.as_ref() {
                    limiter.until_ready().await;
                }
                let fetch_started = Instant::now();
                let fetched = self.transport.fetch(record_type, identifier).await;
                latency_ms += fetch_started.elapsed().as_millis() as u64;
                attempts += 1;

                let (status, result) = match fetched {
                    Ok(raw) => {
                        let result = normalize(&raw, record_type, identifier);
                        (BatchItemStatus::from_verdict(result.verdict), result)
                    }
                    Err(e) => {
                        warn!(identifier = %identifier, error = %e, "lookup failed");
                        let message = e.to_string();
                        (
                            BatchItemStatus::NetworkError(message.clone()),
                            LookupResult::transport_failure(record_type, identifier, message),
                        )
                    }
                };
                if let Err(e) = self
                    .journal
                    .record_lookup(record_type, identifier, result.verdict)
                {
                    warn!(error = %e, "failed to record history entry");
                }
                BatchItem {
                    identifier: identifier.clone(),
                    status,
                    result: Some(result),
                }
            };

            if item.status.is_found() {
                found.push(item.identifier.clone());
            } else {
                not_found.push(item.identifier.clone());
            }
            text.push_str(&report::format_batch_item(
                &item.identifier,
                &item.status,
                item.result.as_ref(),
            ));

            self.sink.on_progress(&BatchProgress {
                processed: idx + 1,
                total,
                found: found.len(),
                not_found: not_found.len(),
                phase: self.phase,
                last: Some((item.identifier.clone(), item.status.clone())),
            });
            items.push(item);
        }

        self.phase = BatchPhase::Aggregating;
        self.stop_ticker();

        let summary = BatchSummary {
            record_type,
            total,
            found,
            not_found,
            elapsed: started.elapsed(),
        };
        text.push_str(&report::format_batch_footer(&summary, &ctx));

        if let Err(e) =
            self.journal
                .record_attempts(attempts, summary.found.len() as u64, latency_ms)
        {
            warn!(error = %e, "failed to update statistics");
        }
        if let Err(e) = self
            .journal
            .record_bulk(record_type, total, summary.found.len())
        {
            warn!(error = %e, "failed to record batch history entry");
        }

        self.sink.on_finish(&summary);
        self.phase = BatchPhase::Done;
        info!(
            %record_type,
            total,
            found = summary.found.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch run finished"
        );

        BatchOutcome {
            summary,
            report: text,
            items,
        }
    }
}

impl Drop for BatchPipeline {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
