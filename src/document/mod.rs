//! Paginated rendering of a text report.
//!
//! The report is tokenized with the same line grammar the formatter writes,
//! then laid out top to bottom on A4 pages (millimetre units). Watermark and
//! footer are added to every page once the page count is known.

pub mod layout;

use serde::Serialize;

use crate::batch::BatchSummary;
use crate::record::schema::{rule_for_label, ValueRule};
use crate::record::RecordType;
use crate::report::grammar::{self, BlockKind, ReportLine, Rule};
use crate::report::{self, DEFAULT_DATA_SOURCE};

use layout::*;

pub const PRODUCT_NAME: &str = "INTELLIGENCE LOOKUP TOOL";
pub const RUNNING_HEADER: &str = "Intelligence Lookup Tool - Continued";
pub const CLASSIFICATION: &str = "Classification: RESTRICTED - Authorized Use Only";
pub const WATERMARK_SECONDARY: &str = "CONFIDENTIAL";

const CONFIDENTIAL_HEADING: &str = "CONFIDENTIAL: FOR AUTHORIZED USE ONLY";
const CONFIDENTIAL_LINES: [&str; 3] = [
    "Data sourced from legitimate databases. Use requires proper authorization.",
    "Intermediary service provider. No data storage. Not liable for misuse.",
    "Compliant with IT Act 2000 & DPDP Act 2023. Do not share publicly.",
];
const CONFIDENTIAL_BOX_HEIGHT: f32 = 45.0;

const WATERMARK_OPACITY: f32 = 0.08;
const WATERMARK_ANGLE: f32 = -30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    /// Font size in points.
    pub size: f32,
    pub bold: bool,
    pub color: Rgb,
    pub align: Align,
    pub opacity: f32,
    /// Rotation in degrees, counter-clockwise positive.
    pub angle: f32,
}

/// A positioned drawing primitive. Coordinates are millimetres from the top
/// left corner; text `y` is the baseline of the first line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    Border {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
        width: f32,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
        width: f32,
    },
    Text {
        x: f32,
        y: f32,
        lines: Vec<String>,
        style: TextStyle,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<Block>,
}

impl Page {
    /// Every text line on the page, in drawing order.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().flat_map(|b| match b {
            Block::Text { lines, .. } => lines.iter().map(String::as_str).collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    pub record_type: Option<RecordType>,
    pub is_batch: bool,
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lays a text report out as pages.
///
/// For batch runs the summary is drawn once at the top and the summary lines
/// embedded in the text are dropped.
pub fn render_document(
    report_text: &str,
    is_batch: bool,
    batch_summary: Option<&BatchSummary>,
) -> Document {
    let tokens = grammar::tokenize(report_text);
    let (record_type, banner) = tokens
        .iter()
        .find_map(|t| match t {
            ReportLine::Banner(title) => {
                RecordType::from_title(title).map(|(rt, _)| (Some(rt), title.clone()))
            }
            _ => None,
        })
        .unwrap_or((None, String::new()));
    let record_type = record_type.or(batch_summary.map(|s| s.record_type));
    let title = if !banner.is_empty() {
        banner
    } else if let Some(rt) = record_type {
        if is_batch {
            rt.batch_title()
        } else {
            rt.report_title().to_string()
        }
    } else {
        "LOOKUP REPORT".to_string()
    };

    let generated_at = tokens
        .iter()
        .find_map(|t| match t {
            ReportLine::Generated(ts) => Some(ts.clone()),
            ReportLine::Meta { label, value } if label == "Generated" => Some(value.clone()),
            _ => None,
        })
        .unwrap_or_else(report::timestamp_now);
    let data_source = tokens
        .iter()
        .find_map(|t| match t {
            ReportLine::Source(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string());

    let mut layout = Layout::new(RUNNING_HEADER);
    first_page_header(&mut layout, &title, &generated_at, &data_source);

    if is_batch {
        if let Some(summary) = batch_summary {
            summary_block(&mut layout, summary);
        }
    }

    let mut started = false;
    for token in tokens.iter() {
        if skipped(token, is_batch) {
            continue;
        }
        if !started && token.is_spacing() {
            continue;
        }
        started = true;
        layout.break_if_needed();
        draw_token(&mut layout, token, record_type);
    }

    confidential_box(&mut layout);

    let pages = layout.finish(|page, count| {
        watermark(page);
        footer(page, count);
    });

    Document {
        title,
        record_type,
        is_batch,
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        pages,
    }
}

fn skipped(token: &ReportLine, is_batch: bool) -> bool {
    match token {
        ReportLine::Generated(_)
        | ReportLine::Source(_)
        | ReportLine::Notice(_)
        | ReportLine::Rule(Rule::Star) => true,
        ReportLine::Meta { .. } | ReportLine::Summary { .. } => is_batch,
        ReportLine::Banner(title) if title == grammar::SUMMARY_BANNER => is_batch,
        ReportLine::Banner(title) => RecordType::from_title(title).is_some(),
        ReportLine::Subject(_) => !is_batch,
        _ => false,
    }
}

fn first_page_header(layout: &mut Layout, title: &str, generated_at: &str, data_source: &str) {
    let centered = TextStyle::body().color(WHITE).align(Align::Center);

    layout.fill(0.0, 0.0, PAGE_WIDTH, 35.0, BLUE);
    layout.line(CENTER_X, 12.0, PRODUCT_NAME, centered.size(16.0).bold());
    layout.line(
        CENTER_X,
        18.0,
        "Advanced Intelligence Analysis Platform",
        centered.size(8.0),
    );
    layout.line(
        CENTER_X,
        23.0,
        "Authorized Use Only | Secure Database Access",
        centered.size(8.0),
    );

    layout.fill(0.0, 35.0, PAGE_WIDTH, 20.0, DARK_BLUE);
    layout.line(CENTER_X, 45.0, title, centered.size(14.0).bold());

    let info = TextStyle::body().size(8.0).color(GRAY);
    layout.line(
        15.0,
        62.0,
        format!("Report Generated: {generated_at}"),
        info,
    );
    layout.line(
        195.0,
        62.0,
        format!("Data Source: {data_source}"),
        info.align(Align::Right),
    );
    layout.push(Block::Rule {
        x1: 15.0,
        y1: 65.0,
        x2: 195.0,
        y2: 65.0,
        color: BLUE,
        width: 0.5,
    });
}

fn summary_block(layout: &mut Layout, summary: &BatchSummary) {
    layout.advance(5.0);
    let y = layout.y();
    layout.fill(15.0, y - 4.0, 180.0, 8.0, BAND_LIGHT);
    layout.line(
        CENTER_X,
        y,
        "BULK LOOKUP SUMMARY",
        TextStyle::body().bold().color(BLUE).align(Align::Center),
    );
    layout.advance(12.0);

    let list = |count: usize, ids: &[String]| {
        if ids.is_empty() {
            count.to_string()
        } else {
            format!("{count} ({})", ids.join(", "))
        }
    };
    let rows = [
        ("Total Requests:", summary.total.to_string(), 6.0),
        ("Found:", list(summary.found.len(), &summary.found), 0.0),
        (
            "Not Found:",
            list(summary.not_found.len(), &summary.not_found),
            0.0,
        ),
        ("Success Rate:", summary.success_rate_label(), 10.0),
    ];
    for (label, value, after) in rows {
        layout.break_if_needed();
        let y = layout.y();
        layout.line(20.0, y, label, TextStyle::body().bold());
        if after > 0.0 {
            layout.line(60.0, y, value, TextStyle::body());
            layout.advance(after);
        } else {
            layout.paragraph(60.0, 120.0, &value, TextStyle::body());
        }
    }
}

fn draw_token(layout: &mut Layout, token: &ReportLine, record_type: Option<RecordType>) {
    match token {
        ReportLine::RecordHeader { kind, .. } => {
            let y = layout.y();
            layout.fill(0.0, y - 4.0, PAGE_WIDTH, 8.0, BAND_LIGHT);
            let text = token.to_string();
            let text = text.trim_start_matches("--- ").trim_end_matches(" ---");
            let color = match kind {
                BlockKind::Record => BLUE,
                BlockKind::Challan => DARK_BLUE,
            };
            layout.line(
                CENTER_X,
                y,
                text.to_uppercase(),
                TextStyle::body().bold().color(color).align(Align::Center),
            );
            layout.advance(10.0);
        }
        ReportLine::ResultHeader(_) | ReportLine::Banner(_) => {
            layout.advance(8.0);
            let y = layout.y();
            layout.fill(15.0, y - 4.0, 180.0, 8.0, BAND_MID);
            layout.line(
                CENTER_X,
                y,
                token.to_string(),
                TextStyle::body().bold().align(Align::Center),
            );
            layout.advance(12.0);
        }
        ReportLine::Field { label, value } => {
            let y = layout.y();
            layout.line(
                15.0,
                y,
                format!("{label}:"),
                TextStyle::body().bold().color(LABEL_GRAY),
            );
            let value = match rule_for_label(record_type, label) {
                ValueRule::Lower => value.to_lowercase(),
                rule => rule.apply(value).to_uppercase(),
            };
            layout.paragraph(50.0, 150.0, &value, TextStyle::body());
        }
        ReportLine::Subject(id) => {
            layout.paragraph(20.0, 170.0, &format!("FOR {id}"), TextStyle::body());
        }
        ReportLine::ListItem(_)
        | ReportLine::Text(_)
        | ReportLine::Meta { .. }
        | ReportLine::Summary { .. } => {
            layout.paragraph(20.0, 170.0, token.to_string().trim(), TextStyle::body());
        }
        ReportLine::Rule(Rule::Heavy) => layout.advance(3.0),
        ReportLine::Blank | ReportLine::Rule(_) => layout.advance(2.0),
        ReportLine::Generated(_) | ReportLine::Source(_) | ReportLine::Notice(_) => {}
    }
}

fn confidential_box(layout: &mut Layout) {
    layout.advance(10.0);
    if layout.y() - 5.0 + CONFIDENTIAL_BOX_HEIGHT > FOOTER_TOP {
        layout.new_page();
        layout.advance(10.0);
    }
    let y = layout.y();
    layout.fill(10.0, y - 5.0, 190.0, CONFIDENTIAL_BOX_HEIGHT, ALERT_FILL);
    layout.push(Block::Border {
        x: 10.0,
        y: y - 5.0,
        w: 190.0,
        h: CONFIDENTIAL_BOX_HEIGHT,
        color: RED,
        width: 1.0,
    });
    layout.line(
        CENTER_X,
        y,
        CONFIDENTIAL_HEADING,
        TextStyle::body()
            .size(12.0)
            .bold()
            .color(RED)
            .align(Align::Center),
    );
    for (i, line) in CONFIDENTIAL_LINES.iter().enumerate() {
        layout.line(
            CENTER_X,
            y + 8.0 * (i as f32 + 1.0),
            *line,
            TextStyle::body().align(Align::Center),
        );
    }
    layout.advance(35.0);
}

fn watermark(page: &mut Page) {
    let style = TextStyle::body()
        .bold()
        .align(Align::Center)
        .faded(WATERMARK_OPACITY, WATERMARK_ANGLE);
    page.blocks.push(Block::Text {
        x: CENTER_X,
        y: 110.0,
        lines: vec![PRODUCT_NAME.to_string()],
        style: style.size(35.0).color(GREEN),
    });
    page.blocks.push(Block::Text {
        x: CENTER_X,
        y: 170.0,
        lines: vec![WATERMARK_SECONDARY.to_string()],
        style: style.size(30.0).color(RED),
    });
}

fn footer(page: &mut Page, count: usize) {
    let style = TextStyle::body().size(7.0).color(GRAY).align(Align::Center);
    let lines = [
        (285.0, format!("Page {} of {count}", page.number)),
        (
            290.0,
            format!(
                "Intelligence Lookup Tool v{} | Secure OSINT Platform",
                env!("CARGO_PKG_VERSION")
            ),
        ),
        (295.0, CLASSIFICATION.to_string()),
    ];
    for (y, text) in lines {
        page.blocks.push(Block::Text {
            x: CENTER_X,
            y,
            lines: vec![text],
            style,
        });
    }
}
