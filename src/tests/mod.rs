use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crate::batch::{BatchPipeline, BatchPolicy, RecordingSink};
use crate::document::{render_document, RUNNING_HEADER};
use crate::history::{HistoryLedger, Journal, MemoryStore, MAX_HISTORY_ITEMS};
use crate::normalizer::normalize;
use crate::record::{RecordType, Verdict};
use crate::report::{self, ReportContext};
use crate::transport::{LookupTransport, TransportError};

/// Transport that answers from a fixed script and records every call.
/// Identifiers without a script entry fail like an unreachable host.
pub(crate) struct ScriptedTransport {
    responses: HashMap<String, Result<String, String>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(mut self, identifier: &str, body: &str) -> Self {
        self.responses
            .insert(identifier.to_string(), Ok(body.to_string()));
        self
    }

    pub(crate) fn fail(mut self, identifier: &str, message: &str) -> Self {
        self.responses
            .insert(identifier.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LookupTransport for ScriptedTransport {
    async fn fetch(
        &self,
        _record_type: RecordType,
        identifier: &str,
    ) -> Result<String, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(identifier.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.responses.get(identifier) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(TransportError::Other {
                message: message.clone(),
            }),
            None => Err(TransportError::Other {
                message: format!("no scripted response for {identifier}"),
            }),
        }
    }
}

fn ctx() -> ReportContext {
    ReportContext {
        generated_at: "19/10/2026, 10:00:00".to_string(),
        data_source: report::DEFAULT_DATA_SOURCE.to_string(),
    }
}

#[tokio::test]
async fn mixed_batch_counts_found_and_bulk_history() {
    let store = Arc::new(MemoryStore::new());
    let journal = Journal::new(store);
    let transport = Arc::new(
        ScriptedTransport::new().respond("9044192030", r#"{"data":[{"name":"john doe"}]}"#),
    );
    let mut pipeline = BatchPipeline::new(
        transport.clone(),
        journal.clone(),
        report::DEFAULT_DATA_SOURCE,
        BatchPolicy::default(),
        Arc::new(RecordingSink::new()),
    );
    let ids = vec!["9044192030".to_string(), "12345".to_string()];

    let outcome = pipeline.run(&ids, RecordType::Mobile).await;

    assert_eq!(outcome.summary.total, 2);
    assert!(outcome.summary.found.len() <= 1);
    assert!(!outcome.summary.not_found.is_empty());
    assert_eq!(
        outcome.summary.found.len() + outcome.summary.not_found.len(),
        2
    );
    assert_eq!(transport.calls(), vec!["9044192030".to_string()]);

    let history = journal.history().unwrap();
    let bulk = &history.entries()[0];
    assert_eq!(bulk.value, "2 mobile numbers");
    assert!(bulk.is_bulk);
    assert_eq!(bulk.result, "Found: 1, Not Found: 1");
}

#[test]
fn ledger_is_capped_and_deduplicated() {
    let mut ledger = HistoryLedger::default();
    for n in 0..(MAX_HISTORY_ITEMS + 5) {
        ledger.insert_single(RecordType::Mobile, &format!("90441920{n:02}"), Verdict::Found);
    }
    assert_eq!(ledger.len(), MAX_HISTORY_ITEMS);

    let newest = ledger.entries()[0].value.clone();
    let oldest_kept = ledger.entries()[MAX_HISTORY_ITEMS - 1].value.clone();
    ledger.insert_single(RecordType::Mobile, &oldest_kept, Verdict::NotFound);
    assert_eq!(ledger.len(), MAX_HISTORY_ITEMS);
    assert_eq!(ledger.entries()[0].value, oldest_kept);
    assert_eq!(ledger.entries()[0].result, "Not Found");
    assert_eq!(ledger.entries()[1].value, newest);
    assert_eq!(
        ledger
            .entries()
            .iter()
            .filter(|e| e.value == oldest_kept)
            .count(),
        1
    );
}

#[test]
fn found_lookup_renders_canonical_fields() {
    let raw = r#"{"data":[{"name":"john doe","email":"A@B.com"}]}"#;
    let result = normalize(raw, RecordType::Mobile, "9044192030");
    assert_eq!(result.verdict, Verdict::Found);

    let text = report::format(&result, &ctx());
    assert!(text.contains("Name: JOHN DOE\n"));
    assert!(text.contains("Email: a@b.com\n"));
    assert!(text.contains("Report generated: 19/10/2026, 10:00:00\n"));
}

#[test]
fn long_report_continues_on_a_second_page() {
    let records: Vec<String> = (0..40)
        .map(|n| format!(r#"{{"name":"person {n}","address":"house {n}, long street"}}"#))
        .collect();
    let raw = format!(r#"{{"data":[{}]}}"#, records.join(","));
    let text = report::format(&normalize(&raw, RecordType::Mobile, "9044192030"), &ctx());

    let document = render_document(&text, false, None);
    assert!(document.page_count() >= 2);
    let second: Vec<&str> = document.pages[1].text_lines().collect();
    assert!(second.contains(&RUNNING_HEADER));
    let footer = format!("Page 2 of {}", document.page_count());
    assert!(second.iter().any(|l| *l == footer));
}

#[tokio::test]
async fn malformed_identifiers_cost_no_transport_call() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut pipeline = BatchPipeline::new(
        transport.clone(),
        Journal::new(Arc::new(MemoryStore::new())),
        report::DEFAULT_DATA_SOURCE,
        BatchPolicy::default(),
        Arc::new(RecordingSink::new()),
    );
    let ids = vec!["22AAAAA0000A1Z".to_string()];
    let outcome = pipeline.run(&ids, RecordType::TaxRegistration).await;
    assert!(transport.calls().is_empty());
    assert_eq!(
        outcome.items[0].status.label(),
        "INVALID FORMAT (Expected 15 characters)"
    );
}
