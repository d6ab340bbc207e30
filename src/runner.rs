use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::batch::{BatchOutcome, BatchPipeline, BatchPolicy, NullSink, ProgressSink};
use crate::history::{HistoryLedger, Journal, KeyValueStore, Statistics, StoreError};
use crate::normalizer::normalize;
use crate::record::{LookupResult, RecordType};
use crate::report::{self, ReportContext, DEFAULT_DATA_SOURCE};
use crate::transport::LookupTransport;
use crate::utils::{self, ValidationError};

pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug)]
pub struct Options {
    /// Pause before a single lookup moves from connecting to fetching.
    pub connect_delay: Duration,
    pub data_source: String,
    /// Batch lookups per second; unbounded when `None`.
    pub rate: Option<u32>,
    /// Period of the batch elapsed-time ticker.
    pub tick: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            connect_delay: DEFAULT_CONNECT_DELAY,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            rate: None,
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid rate {value}, expected a positive integer")]
    InvalidRate { value: u32 },

    #[error("invalid tick interval, expected a non-zero duration")]
    InvalidTick,

    #[error("data source label is empty")]
    EmptyDataSource,

    #[error("no identifiers provided")]
    EmptyBatch,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),
}

/// Status transitions of a single lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupStage {
    Connecting,
    Fetching,
    Done,
}

#[derive(Clone, Debug)]
pub struct LookupOutcome {
    pub result: LookupResult,
    pub report: String,
    pub latency: Duration,
    pub statistics: Statistics,
}

/// Single lookups and batch runs over one transport and one state store.
pub struct Runner {
    options: Options,
    transport: Arc<dyn LookupTransport>,
    journal: Journal,
    pipeline: BatchPipeline,
}

impl Runner {
    pub fn new(
        options: Options,
        transport: Arc<dyn LookupTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, RunnerError> {
        if options.data_source.trim().is_empty() {
            return Err(RunnerError::EmptyDataSource);
        }
        if options.tick.is_zero() {
            return Err(RunnerError::InvalidTick);
        }
        let rate = match options.rate {
            Some(value) => {
                Some(NonZeroU32::new(value).ok_or(RunnerError::InvalidRate { value })?)
            }
            None => None,
        };
        let journal = Journal::new(store);
        let pipeline = BatchPipeline::new(
            transport.clone(),
            journal.clone(),
            &options.data_source,
            BatchPolicy {
                rate,
                tick: options.tick,
            },
            Arc::new(NullSink),
        );
        Ok(Self {
            options,
            transport,
            journal,
            pipeline,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.pipeline.set_sink(sink);
    }

    pub async fn lookup(
        &self,
        record_type: RecordType,
        input: &str,
    ) -> Result<LookupOutcome, RunnerError> {
        self.lookup_with(record_type, input, |_| {}).await
    }

    /// Formats and validates `input`, waits the connect delay, fetches and
    /// normalizes. History is written for every completed fetch and the
    /// statistics for every attempt.
    pub async fn lookup_with<F>(
        &self,
        record_type: RecordType,
        input: &str,
        mut on_stage: F,
    ) -> Result<LookupOutcome, RunnerError>
    where
        F: FnMut(LookupStage),
    {
        let identifier = utils::format_identifier(record_type, input);
        utils::validate_identifier(record_type, &identifier)?;

        on_stage(LookupStage::Connecting);
        if !self.options.connect_delay.is_zero() {
            tokio::time::sleep(self.options.connect_delay).await;
        }

        on_stage(LookupStage::Fetching);
        let started = Instant::now();
        let fetched = self.transport.fetch(record_type, &identifier).await;
        let latency = started.elapsed();

        let result = match fetched {
            Ok(raw) => {
                let result = normalize(&raw, record_type, &identifier);
                self.journal
                    .record_lookup(record_type, &identifier, result.verdict)?;
                result
            }
            Err(e) => {
                warn!(%record_type, identifier = %identifier, error = %e, "lookup failed");
                LookupResult::transport_failure(record_type, &identifier, e.to_string())
            }
        };
        let statistics = self.journal.record_attempts(
            1,
            u64::from(result.verdict.is_found()),
            latency.as_millis() as u64,
        )?;
        debug!(verdict = ?result.verdict, latency_ms = latency.as_millis() as u64, "lookup complete");

        let report = report::format(&result, &ReportContext::now(&self.options.data_source));
        on_stage(LookupStage::Done);
        Ok(LookupOutcome {
            result,
            report,
            latency,
            statistics,
        })
    }

    pub async fn run_batch(
        &mut self,
        identifiers: &[String],
        record_type: RecordType,
    ) -> Result<BatchOutcome, RunnerError> {
        if identifiers.is_empty() {
            return Err(RunnerError::EmptyBatch);
        }
        info!(%record_type, count = identifiers.len(), "starting batch");
        Ok(self.pipeline.run(identifiers, record_type).await)
    }

    pub fn history(&self) -> Result<HistoryLedger, RunnerError> {
        Ok(self.journal.history()?)
    }

    pub fn statistics(&self) -> Result<Statistics, RunnerError> {
        Ok(self.journal.statistics()?)
    }

    pub fn clear_history(&self) -> Result<(), RunnerError> {
        Ok(self.journal.clear_history()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStore;
    use crate::record::Verdict;
    use crate::tests::ScriptedTransport;

    fn runner(transport: Arc<ScriptedTransport>) -> Runner {
        let options = Options {
            connect_delay: Duration::ZERO,
            ..Options::default()
        };
        Runner::new(options, transport, Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn new_rejects_bad_options() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::new());
        let zero_rate = Options {
            rate: Some(0),
            ..Options::default()
        };
        assert!(matches!(
            Runner::new(zero_rate, transport.clone(), store.clone()),
            Err(RunnerError::InvalidRate { value: 0 })
        ));
        let blank = Options {
            data_source: " ".to_string(),
            ..Options::default()
        };
        assert!(matches!(
            Runner::new(blank, transport, store),
            Err(RunnerError::EmptyDataSource)
        ));
    }

    #[tokio::test]
    async fn lookup_formats_identifier_and_records_state() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("9044192030", r#"{"data":[{"name":"john doe"}]}"#),
        );
        let runner = runner(transport.clone());
        let outcome = runner
            .lookup(RecordType::Mobile, "+91 90441-92030")
            .await
            .unwrap();

        assert_eq!(transport.calls(), vec!["9044192030".to_string()]);
        assert_eq!(outcome.result.verdict, Verdict::Found);
        assert!(outcome.report.contains("Name: JOHN DOE\n"));
        assert_eq!(outcome.statistics.total, 1);
        assert_eq!(outcome.statistics.successful, 1);
        assert_eq!(runner.history().unwrap().entries()[0].result, "Found");
    }

    #[tokio::test]
    async fn invalid_identifier_is_rejected_before_transport() {
        let transport = Arc::new(ScriptedTransport::new());
        let runner = runner(transport.clone());
        let err = runner.lookup(RecordType::NationalId, "1234").await.unwrap_err();
        assert!(matches!(err, RunnerError::Validation(_)));
        assert!(transport.calls().is_empty());
        assert_eq!(runner.statistics().unwrap().total, 0);
    }

    #[tokio::test]
    async fn transport_failure_is_reported_not_raised() {
        let transport = Arc::new(ScriptedTransport::new().fail("9044192030", "refused"));
        let runner = runner(transport);
        let mut stages = Vec::new();
        let outcome = runner
            .lookup_with(RecordType::Mobile, "9044192030", |s| stages.push(s))
            .await
            .unwrap();
        assert_eq!(outcome.result.verdict, Verdict::TransportError);
        assert!(outcome.report.contains("Error Details: refused"));
        assert!(runner.history().unwrap().is_empty());
        assert_eq!(runner.statistics().unwrap().successful, 0);
        assert_eq!(
            stages,
            vec![LookupStage::Connecting, LookupStage::Fetching, LookupStage::Done]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_delay_precedes_fetching() {
        let transport = Arc::new(ScriptedTransport::new().respond("9044192030", "{}"));
        let options = Options::default();
        let runner = Runner::new(options, transport, Arc::new(MemoryStore::new())).unwrap();
        let started = Instant::now();
        let mut fetching_at = None;
        runner
            .lookup_with(RecordType::Mobile, "9044192030", |s| {
                if s == LookupStage::Fetching {
                    fetching_at = Some(started.elapsed());
                }
            })
            .await
            .unwrap();
        assert_eq!(fetching_at, Some(DEFAULT_CONNECT_DELAY));
    }

    #[tokio::test]
    async fn empty_batch_is_an_error() {
        let mut runner = runner(Arc::new(ScriptedTransport::new()));
        assert!(matches!(
            runner.run_batch(&[], RecordType::Mobile).await,
            Err(RunnerError::EmptyBatch)
        ));
    }
}
