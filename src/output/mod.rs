pub mod report;

use chrono::Utc;

use crate::batch::BatchSummary;
use crate::document::{render_document, Document};
use crate::report::grammar::{tokenize, BlockKind, ReportLine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".csv") {
        return Some(OutputFormat::Csv);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// `lookout_report_<type>_<timestamp>.<ext>`, with `:` and `.` in the
/// timestamp replaced so the name is portable.
pub fn report_filename(kind: &str, format: OutputFormat) -> String {
    let timestamp = Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("lookout_report_{kind}_{timestamp}.{}", format.extension())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What an export is built from.
pub struct ExportSource<'a> {
    /// `mobile`, `bulk-mobile`, ...
    pub kind: &'a str,
    pub report: &'a str,
    pub batch: Option<&'a BatchSummary>,
}

pub fn build_export(source: &ExportSource<'_>, format: OutputFormat) -> Result<ExportPayload, String> {
    let bytes = match format {
        OutputFormat::Text => source.report.as_bytes().to_vec(),
        OutputFormat::Csv => render_csv(source.report)?,
        OutputFormat::Json => render_json(&document_for(source))?,
        OutputFormat::Html => report::render_html(&document_for(source)),
    };
    Ok(ExportPayload {
        filename: report_filename(source.kind, format),
        bytes,
    })
}

fn document_for(source: &ExportSource<'_>) -> Document {
    render_document(source.report, source.batch.is_some(), source.batch)
}

pub fn render_json(document: &Document) -> Result<Vec<u8>, String> {
    serde_json::to_vec_pretty(document).map_err(|e| format!("failed to encode document: {e}"))
}

/// One row per label/value line of the report.
///
/// Columns: `identifier, section, index, label, value`. Footer, notices and
/// separators are dropped.
pub fn render_csv(report_text: &str) -> Result<Vec<u8>, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["identifier", "section", "index", "label", "value"])
        .map_err(|e| format!("failed to write csv header: {e}"))?;

    let mut identifier = String::new();
    let mut section = "report";
    let mut index = String::new();
    let mut list_label = String::new();

    for line in tokenize(report_text) {
        let row: Option<(String, String)> = match line {
            ReportLine::Subject(id) | ReportLine::ResultHeader(id) => {
                identifier = id;
                section = "result";
                index.clear();
                None
            }
            ReportLine::RecordHeader {
                kind,
                index: i,
                identifier: id,
            } => {
                if let Some(id) = id {
                    identifier = id;
                }
                section = match kind {
                    BlockKind::Record => "record",
                    BlockKind::Challan => "challan",
                };
                index = i.to_string();
                None
            }
            ReportLine::Banner(title) if title == crate::report::grammar::SUMMARY_BANNER => {
                identifier.clear();
                section = "summary";
                index.clear();
                None
            }
            ReportLine::Field { label, value } => Some((label, value)),
            ReportLine::Meta { label, value } => Some((label, value)),
            ReportLine::Summary { label, value } => Some((label, value)),
            ReportLine::Text(text) => match text.strip_suffix(':') {
                Some(label) => {
                    list_label = label.to_string();
                    None
                }
                None => None,
            },
            ReportLine::ListItem(item) => Some((list_label.clone(), item)),
            _ => None,
        };
        let Some((label, value)) = row else {
            continue;
        };
        let row_section = line_section_override(&label, section).unwrap_or(section);
        writer
            .write_record([
                identifier.as_str(),
                row_section,
                index.as_str(),
                label.as_str(),
                value.as_str(),
            ])
            .map_err(|e| format!("failed to write csv row: {e}"))?;
    }

    writer
        .into_inner()
        .map_err(|e| format!("failed to flush csv: {e}"))
}

/// Batch header lines sit before any result header.
fn line_section_override(label: &str, section: &'static str) -> Option<&'static str> {
    if section == "report" && crate::report::grammar::META_LABELS.contains(&label) {
        return Some("batch");
    }
    None
}
