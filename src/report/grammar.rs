use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::record::RecordType;

pub const HEAVY_RULE: &str = "========================================================";
pub const LIGHT_RULE: &str = "-------------------------------------------";
pub const STAR_RULE: &str = "***************************************";

pub const CHALLAN_BANNER: &str = "CHALLAN DETAILS";
pub const SUMMARY_BANNER: &str = "BULK SEARCH SUMMARY";

pub const GENERATED_PREFIX: &str = "Report generated: ";
pub const SOURCE_PREFIX: &str = "Data Source: ";

pub const NOTICE_LINES: [&str; 4] = [
    "CONFIDENTIAL: For authorized use only.",
    "Data from legal sources. Use with consent/authorization.",
    "Intermediary service, no storage, not liable.",
    "IT Act & DPDP compliant. Do not share publicly.",
];

/// Labels that only ever appear in a batch report's header block.
pub const META_LABELS: [&str; 2] = ["Generated", "Total Numbers"];

/// Labels that only ever appear in a batch report's summary block.
pub const SUMMARY_LABELS: [&str; 6] = [
    "TOTAL REQUEST",
    "FOUND",
    "Found Numbers",
    "NOT FOUND",
    "Not Found Numbers",
    "Success Rate",
];

const SUBJECT_INDENT: &str = "                 ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Heavy,
    Light,
    Star,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Record,
    Challan,
}

impl BlockKind {
    fn word(self) -> &'static str {
        match self {
            BlockKind::Record => "RECORD",
            BlockKind::Challan => "CHALLAN",
        }
    }
}

/// One line of a text report.
///
/// The formatter builds reports out of these and the document renderer and
/// delimited export read them back with [`tokenize`], so the text report is
/// the only interchange format between them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    Blank,
    Rule(Rule),
    /// Report or section title.
    Banner(String),
    /// The centered `FOR <identifier>` line under a report title.
    Subject(String),
    RecordHeader {
        kind: BlockKind,
        index: usize,
        identifier: Option<String>,
    },
    /// Per-identifier header inside a batch report.
    ResultHeader(String),
    Field {
        label: String,
        value: String,
    },
    ListItem(String),
    Text(String),
    /// Batch header line (`Generated`, `Total Numbers`).
    Meta {
        label: String,
        value: String,
    },
    /// Batch summary line.
    Summary {
        label: String,
        value: String,
    },
    Generated(String),
    Source(String),
    Notice(String),
}

impl ReportLine {
    pub fn field(label: impl Into<String>, value: impl Into<String>) -> Self {
        ReportLine::Field {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Classifies a single line without any surrounding context.
    ///
    /// `Meta` and `Summary` lines look like fields on their own; [`tokenize`]
    /// promotes them based on where they appear.
    pub fn parse(line: &str) -> ReportLine {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReportLine::Blank;
        }
        if let Some(rule) = parse_rule(trimmed) {
            return ReportLine::Rule(rule);
        }
        if let Some(caps) = record_header_re().captures(trimmed) {
            let kind = if &caps[1] == "CHALLAN" {
                BlockKind::Challan
            } else {
                BlockKind::Record
            };
            if let Ok(index) = caps[2].parse::<usize>() {
                return ReportLine::RecordHeader {
                    kind,
                    index,
                    identifier: caps.get(3).map(|m| m.as_str().to_string()),
                };
            }
        }
        if let Some(id) = trimmed.strip_prefix("RESULT FOR ") {
            return ReportLine::ResultHeader(id.trim().to_string());
        }
        if line.starts_with(' ') {
            if let Some(id) = trimmed.strip_prefix("FOR ") {
                return ReportLine::Subject(id.trim().to_string());
            }
        }
        if trimmed == CHALLAN_BANNER
            || trimmed == SUMMARY_BANNER
            || RecordType::from_title(trimmed).is_some()
        {
            return ReportLine::Banner(trimmed.to_string());
        }
        if let Some(ts) = trimmed.strip_prefix(GENERATED_PREFIX) {
            return ReportLine::Generated(ts.to_string());
        }
        if let Some(source) = trimmed.strip_prefix(SOURCE_PREFIX) {
            return ReportLine::Source(source.to_string());
        }
        if NOTICE_LINES.contains(&trimmed) {
            return ReportLine::Notice(trimmed.to_string());
        }
        if let Some(item) = line.strip_prefix(" - ") {
            return ReportLine::ListItem(item.trim().to_string());
        }
        if let Some((label, value)) = trimmed.split_once(": ") {
            if !label.is_empty() {
                return ReportLine::field(label, value);
            }
        }
        ReportLine::Text(trimmed.to_string())
    }

    pub fn is_spacing(&self) -> bool {
        matches!(self, ReportLine::Blank | ReportLine::Rule(_))
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLine::Blank => Ok(()),
            ReportLine::Rule(Rule::Heavy) => f.write_str(HEAVY_RULE),
            ReportLine::Rule(Rule::Light) => f.write_str(LIGHT_RULE),
            ReportLine::Rule(Rule::Star) => f.write_str(STAR_RULE),
            ReportLine::Banner(title) => f.write_str(title),
            ReportLine::Subject(id) => write!(f, "{SUBJECT_INDENT}FOR {id}"),
            ReportLine::RecordHeader {
                kind,
                index,
                identifier: Some(id),
            } => write!(f, "--- {} {index} FOR {id} ---", kind.word()),
            ReportLine::RecordHeader {
                kind,
                index,
                identifier: None,
            } => write!(f, "--- {} {index} ---", kind.word()),
            ReportLine::ResultHeader(id) => write!(f, "RESULT FOR {id}"),
            ReportLine::Field { label, value }
            | ReportLine::Meta { label, value }
            | ReportLine::Summary { label, value } => write!(f, "{label}: {value}"),
            ReportLine::ListItem(item) => write!(f, " - {item}"),
            ReportLine::Text(text) => f.write_str(text),
            ReportLine::Generated(ts) => write!(f, "{GENERATED_PREFIX}{ts}"),
            ReportLine::Source(source) => write!(f, "{SOURCE_PREFIX}{source}"),
            ReportLine::Notice(line) => f.write_str(line),
        }
    }
}

fn parse_rule(trimmed: &str) -> Option<Rule> {
    if trimmed.len() < 5 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if !trimmed.chars().all(|c| c == first) {
        return None;
    }
    match first {
        '=' => Some(Rule::Heavy),
        '-' => Some(Rule::Light),
        '*' => Some(Rule::Star),
        _ => None,
    }
}

fn record_header_re() -> &'static Regex {
    static RECORD_HEADER_RE: OnceLock<Regex> = OnceLock::new();
    RECORD_HEADER_RE.get_or_init(|| {
        Regex::new(r"^--- (RECORD|CHALLAN) (\d+)(?: FOR (.+?))? ---$")
            .expect("valid record header regex")
    })
}

/// Joins report lines into report text.
pub fn render(lines: &[ReportLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Body,
    BatchHeader,
    Summary,
}

/// Parses report text back into typed lines, promoting batch header and
/// summary lines by position.
pub fn tokenize(text: &str) -> Vec<ReportLine> {
    let mut section = Section::Body;
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = ReportLine::parse(raw);
        section = match &line {
            ReportLine::Banner(title) if title == SUMMARY_BANNER => Section::Summary,
            ReportLine::Banner(title) => match RecordType::from_title(title) {
                Some((_, true)) => Section::BatchHeader,
                _ => section,
            },
            ReportLine::ResultHeader(_)
            | ReportLine::Generated(_)
            | ReportLine::Source(_)
            | ReportLine::Notice(_)
            | ReportLine::Rule(Rule::Star) => Section::Body,
            _ => section,
        };
        let line = match (section, line) {
            (Section::BatchHeader, ReportLine::Field { label, value })
                if META_LABELS.contains(&label.as_str()) =>
            {
                ReportLine::Meta { label, value }
            }
            (Section::Summary, ReportLine::Field { label, value })
                if SUMMARY_LABELS.contains(&label.as_str()) =>
            {
                ReportLine::Summary { label, value }
            }
            (_, line) => line,
        };
        out.push(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_line_kind_survives_render_and_parse() {
        let lines = vec![
            ReportLine::Rule(Rule::Heavy),
            ReportLine::Banner(RecordType::Mobile.report_title().to_string()),
            ReportLine::Subject("9044192030".to_string()),
            ReportLine::Blank,
            ReportLine::RecordHeader {
                kind: BlockKind::Record,
                index: 1,
                identifier: Some("9044192030".to_string()),
            },
            ReportLine::field("Name", "JOHN DOE"),
            ReportLine::RecordHeader {
                kind: BlockKind::Challan,
                index: 2,
                identifier: None,
            },
            ReportLine::Text("Violations:".to_string()),
            ReportLine::ListItem("Over speeding".to_string()),
            ReportLine::Rule(Rule::Light),
            ReportLine::Generated("01/01/2026, 10:00:00".to_string()),
            ReportLine::Source("Secure OSINT Database".to_string()),
            ReportLine::Rule(Rule::Star),
            ReportLine::Notice(NOTICE_LINES[0].to_string()),
        ];
        assert_eq!(tokenize(&render(&lines)), lines);
    }

    #[test]
    fn notice_line_is_not_a_field() {
        assert_eq!(
            ReportLine::parse(NOTICE_LINES[0]),
            ReportLine::Notice(NOTICE_LINES[0].to_string())
        );
    }

    #[test]
    fn batch_lines_are_promoted_by_section() {
        let text = [
            HEAVY_RULE,
            "BULK MOBILE SEARCH REPORT",
            HEAVY_RULE,
            "Generated: 01/01/2026",
            "Total Numbers: 2",
            "RESULT FOR 9044192030",
            "Status: DATA FOUND",
            SUMMARY_BANNER,
            "FOUND: 1",
            "Success Rate: 50.00%",
            STAR_RULE,
            "FOUND: 1",
        ]
        .join("\n");
        let tokens = tokenize(&text);
        assert!(matches!(&tokens[3], ReportLine::Meta { label, .. } if label == "Generated"));
        assert!(matches!(&tokens[4], ReportLine::Meta { label, .. } if label == "Total Numbers"));
        assert!(matches!(&tokens[6], ReportLine::Field { label, .. } if label == "Status"));
        assert!(matches!(&tokens[8], ReportLine::Summary { label, .. } if label == "FOUND"));
        assert!(matches!(&tokens[9], ReportLine::Summary { .. }));
        assert!(matches!(&tokens[11], ReportLine::Field { .. }));
    }

    #[test]
    fn field_splits_on_first_separator_only() {
        assert_eq!(
            ReportLine::parse("Address: 1: MAIN ST"),
            ReportLine::field("Address", "1: MAIN ST")
        );
    }
}
