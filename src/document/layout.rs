use super::{Align, Block, Page, Rgb, TextStyle};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const CENTER_X: f32 = PAGE_WIDTH / 2.0;

/// Cursor position of the first content line on page one.
pub const FIRST_CONTENT_Y: f32 = 75.0;
/// Cursor position after a page break.
pub const CONTINUED_TOP: f32 = 20.0;
/// A page break happens before a line once the cursor passes this.
pub const PAGE_BREAK_Y: f32 = 270.0;
/// Lowest point the confidentiality box may reach before the footer.
pub const FOOTER_TOP: f32 = 280.0;
pub const LINE_HEIGHT: f32 = 5.0;

pub const BODY_SIZE: f32 = 9.0;

const PT_TO_MM: f32 = 0.3528;
/// Average glyph width of a proportional sans font relative to its size.
const GLYPH_RATIO: f32 = 0.5;

pub const BLUE: Rgb = Rgb(26, 115, 232);
pub const DARK_BLUE: Rgb = Rgb(13, 71, 161);
pub const GREEN: Rgb = Rgb(52, 168, 83);
pub const RED: Rgb = Rgb(234, 67, 53);
pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const GRAY: Rgb = Rgb(100, 100, 100);
pub const LABEL_GRAY: Rgb = Rgb(60, 60, 60);
pub const BAND_LIGHT: Rgb = Rgb(240, 240, 240);
pub const BAND_MID: Rgb = Rgb(220, 220, 220);
pub const ALERT_FILL: Rgb = Rgb(255, 245, 245);

impl TextStyle {
    pub fn body() -> Self {
        Self {
            size: BODY_SIZE,
            bold: false,
            color: BLACK,
            align: Align::Left,
            opacity: 1.0,
            angle: 0.0,
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn faded(mut self, opacity: f32, angle: f32) -> Self {
        self.opacity = opacity;
        self.angle = angle;
        self
    }
}

/// Greedy word wrap to `width_mm` at the given font size. Words wider than
/// a line are split. Always returns at least one line.
pub fn wrap_text(text: &str, width_mm: f32, size: f32) -> Vec<String> {
    let glyph_mm = size * PT_TO_MM * GLYPH_RATIO;
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Page list plus a vertical cursor in millimetres.
#[derive(Debug)]
pub struct Layout {
    pages: Vec<Page>,
    y: f32,
    running_header: String,
}

impl Layout {
    pub fn new(running_header: impl Into<String>) -> Self {
        Self {
            pages: vec![Page {
                number: 1,
                blocks: Vec::new(),
            }],
            y: FIRST_CONTENT_Y,
            running_header: running_header.into(),
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn advance(&mut self, mm: f32) {
        self.y += mm;
    }

    pub fn push(&mut self, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    pub fn fill(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.push(Block::Fill { x, y, w, h, color });
    }

    pub fn text(&mut self, x: f32, y: f32, lines: Vec<String>, style: TextStyle) {
        self.push(Block::Text { x, y, lines, style });
    }

    pub fn line(&mut self, x: f32, y: f32, text: impl Into<String>, style: TextStyle) {
        self.text(x, y, vec![text.into()], style);
    }

    /// Wrapped text at the cursor; advances by the number of lines. A line
    /// that would start past the break line continues on a new page.
    pub fn paragraph(&mut self, x: f32, width: f32, text: &str, style: TextStyle) {
        let mut top = self.y;
        let mut chunk = Vec::new();
        for line in wrap_text(text, width, style.size) {
            if self.y > PAGE_BREAK_Y {
                if !chunk.is_empty() {
                    self.text(x, top, std::mem::take(&mut chunk), style);
                }
                self.new_page();
                top = self.y;
            }
            chunk.push(line);
            self.y += LINE_HEIGHT;
        }
        if !chunk.is_empty() {
            self.text(x, top, chunk, style);
        }
    }

    pub fn break_if_needed(&mut self) {
        if self.y > PAGE_BREAK_Y {
            self.new_page();
        }
    }

    /// Starts a page with the running header band and resets the cursor.
    pub fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        self.pages.push(Page {
            number,
            blocks: Vec::new(),
        });
        self.fill(0.0, 0.0, PAGE_WIDTH, 15.0, BLUE);
        let header = self.running_header.clone();
        self.line(
            CENTER_X,
            10.0,
            header,
            TextStyle::body().size(10.0).color(WHITE).align(Align::Center),
        );
        self.y = CONTINUED_TOP;
    }

    /// Applies `decorate` to every page once layout is complete.
    pub fn finish<F>(mut self, mut decorate: F) -> Vec<Page>
    where
        F: FnMut(&mut Page, usize),
    {
        let count = self.pages.len();
        for page in self.pages.iter_mut() {
            decorate(page, count);
        }
        self.pages
    }
}
