pub mod grammar;

use chrono::Local;
use itertools::Itertools;

use crate::batch::{BatchItemStatus, BatchSummary};
use crate::record::{CanonicalRecord, FieldValue, LookupResult, RecordType, Verdict};

pub use grammar::{tokenize, BlockKind, ReportLine, Rule};

pub const DEFAULT_DATA_SOURCE: &str = "Secure OSINT Database";

/// Values stamped into a report that do not come from the lookup itself.
#[derive(Clone, Debug)]
pub struct ReportContext {
    pub generated_at: String,
    pub data_source: String,
}

impl ReportContext {
    pub fn now(data_source: &str) -> Self {
        Self {
            generated_at: timestamp_now(),
            data_source: data_source.to_string(),
        }
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::now(DEFAULT_DATA_SOURCE)
    }
}

pub fn timestamp_now() -> String {
    Local::now().format("%d/%m/%Y, %H:%M:%S").to_string()
}

/// Renders a single lookup into report text.
pub fn format(result: &LookupResult, ctx: &ReportContext) -> String {
    grammar::render(&report_lines(result, ctx))
}

pub fn report_lines(result: &LookupResult, ctx: &ReportContext) -> Vec<ReportLine> {
    let mut lines = match result.verdict {
        Verdict::Found => found_lines(result),
        _ => failure_lines(result),
    };
    lines.extend(footer_lines(ctx));
    lines
}

fn found_lines(result: &LookupResult) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Banner(result.record_type.report_title().to_string()),
        ReportLine::Subject(result.identifier.clone()),
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Blank,
    ];
    lines.extend(record_blocks(&result.records, &result.identifier));
    lines.extend(violation_blocks(&result.violations));
    lines
}

fn failure_lines(result: &LookupResult) -> Vec<ReportLine> {
    let id = &result.identifier;
    match result.verdict {
        Verdict::TransportError => {
            let details = result.transport_error.as_deref().unwrap_or("unknown error");
            vec![
                ReportLine::Text("Network Error: Unable to connect to database".to_string()),
                ReportLine::Blank,
                ReportLine::Text(format!("Error Details: {details}")),
                ReportLine::Blank,
                ReportLine::Text(
                    "Please check your internet connection and try again.".to_string(),
                ),
                ReportLine::Blank,
            ]
        }
        verdict => {
            let headline = if verdict == Verdict::Malformed {
                format!("No data available for {id}")
            } else {
                format!("Data not found for {id}")
            };
            let mut lines = vec![
                ReportLine::Text(headline),
                ReportLine::Blank,
                ReportLine::Text("Server Raw Response:".to_string()),
            ];
            lines.extend(
                crate::normalizer::clean_raw_response(&result.raw)
                    .iter()
                    .map(|l| ReportLine::parse(l)),
            );
            lines.push(ReportLine::Blank);
            lines
        }
    }
}

/// Indexed record blocks. Only the first header carries the identifier,
/// every record in one lookup shares it.
pub fn record_blocks(records: &[CanonicalRecord], identifier: &str) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        lines.push(ReportLine::RecordHeader {
            kind: BlockKind::Record,
            index: idx + 1,
            identifier: (idx == 0).then(|| identifier.to_string()),
        });
        lines.extend(field_lines(record));
        lines.push(ReportLine::Blank);
    }
    lines
}

fn violation_blocks(violations: &[CanonicalRecord]) -> Vec<ReportLine> {
    if violations.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Banner(grammar::CHALLAN_BANNER.to_string()),
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Blank,
    ];
    for (idx, challan) in violations.iter().enumerate() {
        lines.push(ReportLine::RecordHeader {
            kind: BlockKind::Challan,
            index: idx + 1,
            identifier: None,
        });
        lines.extend(field_lines(challan));
        lines.push(ReportLine::Blank);
    }
    lines
}

fn field_lines(record: &CanonicalRecord) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    for field in &record.fields {
        match &field.value {
            FieldValue::List(items) => {
                lines.push(ReportLine::Text(format!("{}:", field.label)));
                lines.extend(items.iter().map(|i| ReportLine::ListItem(i.clone())));
            }
            value => lines.push(ReportLine::field(field.label, value.to_string())),
        }
    }
    lines
}

pub fn footer_lines(ctx: &ReportContext) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::Rule(Rule::Light),
        ReportLine::Generated(ctx.generated_at.clone()),
        ReportLine::Source(ctx.data_source.clone()),
        ReportLine::Rule(Rule::Light),
        ReportLine::Blank,
        ReportLine::Rule(Rule::Star),
    ];
    lines.extend(
        grammar::NOTICE_LINES
            .iter()
            .map(|l| ReportLine::Notice(l.to_string())),
    );
    lines.push(ReportLine::Rule(Rule::Star));
    lines
}

pub fn format_batch_header(record_type: RecordType, total: usize, ctx: &ReportContext) -> String {
    grammar::render(&[
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Banner(record_type.batch_title()),
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Meta {
            label: "Generated".to_string(),
            value: ctx.generated_at.clone(),
        },
        ReportLine::Meta {
            label: "Total Numbers".to_string(),
            value: total.to_string(),
        },
        ReportLine::Rule(Rule::Heavy),
    ])
}

/// The block appended to a batch report for one identifier.
pub fn format_batch_item(
    identifier: &str,
    status: &BatchItemStatus,
    result: Option<&LookupResult>,
) -> String {
    let mut lines = vec![
        ReportLine::Blank,
        ReportLine::Rule(Rule::Heavy),
        ReportLine::ResultHeader(identifier.to_string()),
        ReportLine::Rule(Rule::Heavy),
    ];
    if let (BatchItemStatus::Found, Some(result)) = (status, result) {
        lines.extend(record_blocks(&result.records, identifier));
        lines.extend(violation_blocks(&result.violations));
    }
    lines.push(ReportLine::field("Status", status.label()));
    grammar::render(&lines)
}

fn number_list(numbers: &[String]) -> String {
    if numbers.is_empty() {
        "None".to_string()
    } else {
        numbers.iter().join(", ")
    }
}

/// Summary block plus the standard footer.
pub fn format_batch_footer(summary: &BatchSummary, ctx: &ReportContext) -> String {
    let summary_line = |label: &str, value: String| ReportLine::Summary {
        label: label.to_string(),
        value,
    };
    let mut lines = vec![
        ReportLine::Blank,
        ReportLine::Blank,
        ReportLine::Rule(Rule::Heavy),
        ReportLine::Banner(grammar::SUMMARY_BANNER.to_string()),
        ReportLine::Rule(Rule::Heavy),
        summary_line("TOTAL REQUEST", summary.total.to_string()),
        ReportLine::Blank,
        summary_line("FOUND", summary.found.len().to_string()),
        summary_line("Found Numbers", number_list(&summary.found)),
        ReportLine::Blank,
        summary_line("NOT FOUND", summary.not_found.len().to_string()),
        summary_line("Not Found Numbers", number_list(&summary.not_found)),
        ReportLine::Blank,
        summary_line("Success Rate", summary.success_rate_label()),
        ReportLine::Blank,
    ];
    lines.extend(footer_lines(ctx));
    grammar::render(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use pretty_assertions::assert_eq;

    fn ctx() -> ReportContext {
        ReportContext {
            generated_at: "19/10/2026, 10:00:00".to_string(),
            data_source: DEFAULT_DATA_SOURCE.to_string(),
        }
    }

    #[test]
    fn found_report_renders_fields_and_first_record_identifier() {
        let raw = r#"{"data":[{"name":"john doe","email":"A@B.com"},{"name":"jane doe"}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        let text = format(&result, &ctx());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"Name: JOHN DOE"));
        assert!(lines.contains(&"Email: a@b.com"));
        assert!(lines.contains(&"--- RECORD 1 FOR 9044192030 ---"));
        assert!(lines.contains(&"--- RECORD 2 ---"));
        assert!(!lines.contains(&"--- RECORD 2 FOR 9044192030 ---"));
        assert_eq!(lines[1], "MOBILE NUMBER ANALYSIS REPORT");
        assert_eq!(lines[2].trim(), "FOR 9044192030");
    }

    #[test]
    fn absent_fields_produce_no_lines() {
        let result = normalize(r#"{"data":[{"name":"x"}]}"#, RecordType::Mobile, "9044192030");
        let text = format(&result, &ctx());
        assert!(!text.contains("Email:"));
        assert!(!text.contains("Father's Name:"));
    }

    #[test]
    fn footer_is_always_present() {
        let found = normalize(r#"{"data":[{"name":"x"}]}"#, RecordType::Mobile, "1");
        let missing = normalize("not found", RecordType::Mobile, "1");
        for result in [found, missing] {
            let text = format(&result, &ctx());
            assert!(text.contains("Report generated: 19/10/2026, 10:00:00"));
            for notice in grammar::NOTICE_LINES {
                assert!(text.contains(notice));
            }
            assert!(text.trim_end().ends_with(grammar::STAR_RULE));
        }
    }

    #[test]
    fn failure_headlines_differ_by_verdict() {
        let not_found = format(&normalize("No Data", RecordType::Mobile, "42"), &ctx());
        assert!(not_found.starts_with("Data not found for 42\n"));
        assert!(not_found.contains("Server Raw Response:\nNo Data\n"));

        let malformed = format(&normalize("<html>", RecordType::Mobile, "42"), &ctx());
        assert!(malformed.starts_with("No data available for 42\n"));

        let failed = LookupResult::transport_failure(
            RecordType::Mobile,
            "42",
            "connection refused".to_string(),
        );
        let network = format(&failed, &ctx());
        assert!(network.starts_with("Network Error: Unable to connect to database"));
        assert!(network.contains("Error Details: connection refused"));
    }

    #[test]
    fn vehicle_report_lists_challans_without_identifier() {
        let raw = r#"{"result":{"vehicle_response":{"owner_name":"sam"},
            "challan_response":{"data":[{"number":"CH1","violations":{"details":{"offence_a":"No helmet"}}}]}}}"#;
        let text = format(&normalize(raw, RecordType::Vehicle, "UP32AB1234"), &ctx());
        assert!(text.contains("CHALLAN DETAILS\n"));
        assert!(text.contains("--- CHALLAN 1 ---\nChallan Number: CH1\nViolations:\n - No helmet\n"));
    }

    #[test]
    fn batch_footer_guards_and_lists_numbers() {
        let summary = BatchSummary {
            record_type: RecordType::Mobile,
            total: 2,
            found: vec!["9044192030".to_string()],
            not_found: vec!["12345".to_string()],
            elapsed: std::time::Duration::from_secs(1),
        };
        let text = format_batch_footer(&summary, &ctx());
        assert!(text.contains("TOTAL REQUEST: 2\n"));
        assert!(text.contains("Found Numbers: 9044192030\n"));
        assert!(text.contains("Not Found Numbers: 12345\n"));
        assert!(text.contains("Success Rate: 50.00%\n"));
    }
}
