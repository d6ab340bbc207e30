use std::fmt::Write as _;

use crate::document::{Align, Block, Document, Page, TextStyle};

const PT_TO_MM: f32 = 0.3528;

fn json_for_script_tag(value: &str) -> String {
    value.replace("</", "<\\/")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn text_transform(style: &TextStyle) -> String {
    let shift = match style.align {
        Align::Left => "",
        Align::Center => "translateX(-50%) ",
        Align::Right => "translateX(-100%) ",
    };
    if style.angle == 0.0 {
        shift.trim_end().to_string()
    } else {
        format!("{shift}rotate({}deg)", -style.angle)
    }
}

fn render_block(out: &mut String, block: &Block) {
    match block {
        Block::Fill { x, y, w, h, color } => {
            let _ = writeln!(
                out,
                r#"      <div class="fill" style="left:{x}mm;top:{y}mm;width:{w}mm;height:{h}mm;background:{}"></div>"#,
                color.hex()
            );
        }
        Block::Border {
            x,
            y,
            w,
            h,
            color,
            width,
        } => {
            let _ = writeln!(
                out,
                r#"      <div class="border" style="left:{x}mm;top:{y}mm;width:{w}mm;height:{h}mm;border:{width}mm solid {}"></div>"#,
                color.hex()
            );
        }
        Block::Rule {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        } => {
            let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
            let _ = writeln!(
                out,
                r#"      <div class="rule" style="left:{x1}mm;top:{y1}mm;width:{len}mm;border-top:{width}mm solid {}"></div>"#,
                color.hex()
            );
        }
        Block::Text { x, y, lines, style } => {
            let top = y - style.size * PT_TO_MM;
            let weight = if style.bold { 700 } else { 400 };
            let align = match style.align {
                Align::Left => "left",
                Align::Center => "center",
                Align::Right => "right",
            };
            let body = lines
                .iter()
                .map(|l| escape_html(l))
                .collect::<Vec<_>>()
                .join("<br/>");
            let _ = writeln!(
                out,
                r#"      <div class="text" style="left:{x}mm;top:{top}mm;font-size:{}pt;font-weight:{weight};color:{};opacity:{};text-align:{align};transform:{}">{body}</div>"#,
                style.size,
                style.color.hex(),
                style.opacity,
                text_transform(style),
            );
        }
    }
}

fn render_page(out: &mut String, page: &Page) {
    let _ = writeln!(
        out,
        r#"    <section class="page" id="page-{}">"#,
        page.number
    );
    for block in page.blocks.iter() {
        render_block(out, block);
    }
    out.push_str("    </section>\n");
}

/// Self-contained HTML: one fixed-size box per page with absolutely
/// positioned blocks. The document model is embedded as JSON as well.
pub fn render_html(document: &Document) -> Vec<u8> {
    let json = serde_json::to_string(document).unwrap_or_else(|_| "{}".to_string());
    let json = json_for_script_tag(&json);

    let mut pages = String::new();
    for page in document.pages.iter() {
        render_page(&mut pages, page);
    }

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{title}</title>
  <style>
    body {{
      margin: 0;
      padding: 12mm 0;
      background: #5f6368;
      font-family: Helvetica, Arial, sans-serif;
    }}
    .page {{
      position: relative;
      width: {width}mm;
      height: {height}mm;
      margin: 0 auto 12mm auto;
      background: #ffffff;
      overflow: hidden;
      box-shadow: 0 2px 12px rgba(0, 0, 0, 0.35);
    }}
    .fill, .border, .rule, .text {{
      position: absolute;
      box-sizing: border-box;
    }}
    .text {{
      white-space: pre;
      line-height: 5mm;
      transform-origin: center center;
    }}
    @media print {{
      body {{ padding: 0; background: none; }}
      .page {{ margin: 0; box-shadow: none; page-break-after: always; }}
    }}
  </style>
</head>
<body>
  <script type="application/json" id="document-data">{json}</script>
  <main>
{pages}  </main>
</body>
</html>
"####,
        title = escape_html(&document.title),
        width = document.width,
        height = document.height,
    );

    html.into_bytes()
}
