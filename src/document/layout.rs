use super::asset::AssetSlot;
use super::fonts::{text_width, FontStyle};
use super::{Block, ImageBlock, Page, Rgb, Run, TextBlock};

/// US Letter in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 40.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BOTTOM: f32 = PAGE_HEIGHT - MARGIN;

pub const LINE_SPACING: f32 = 1.2;

pub fn line_height(size: f32) -> f32 {
    size * LINE_SPACING
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Scale `width`×`height` to the largest size that fits the box while
/// keeping the aspect ratio. Small images are scaled up.
pub fn fit(width: u32, height: u32, bounds: BoundingBox) -> BoundingBox {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (bounds.width / w).min(bounds.height / h);
    BoundingBox::new(w * scale, h * scale)
}

/// Greedy word wrap over styled runs.
///
/// `\n` forces a break. Whitespace at a wrap point is dropped, and a word
/// wider than `max_width` is split between characters.
pub fn wrap(runs: &[Run], size: f32, max_width: f32) -> Vec<Vec<Run>> {
    let mut lines = Vec::new();
    let mut line = LineBuilder::default();
    let mut pending: Vec<(FontStyle, String)> = Vec::new();

    for run in runs {
        for (index, paragraph) in run.text.split('\n').enumerate() {
            if index > 0 {
                lines.push(std::mem::take(&mut line).runs);
                pending.clear();
            }

            for token in tokens(paragraph) {
                if token.starts_with(char::is_whitespace) {
                    pending.push((run.style, token.to_string()));
                    continue;
                }

                let word_width = text_width(run.style, token, size);
                let space_width: f32 = pending
                    .iter()
                    .map(|(style, text)| text_width(*style, text, size))
                    .sum();

                if !line.is_empty() && line.width + space_width + word_width > max_width {
                    lines.push(std::mem::take(&mut line).runs);
                    pending.clear();
                }

                if !line.is_empty() {
                    for (style, text) in pending.drain(..) {
                        line.push(style, &text, size);
                    }
                }
                pending.clear();

                if word_width <= max_width {
                    line.push(run.style, token, size);
                } else {
                    for c in token.chars() {
                        let mut buf = [0u8; 4];
                        let piece: &str = c.encode_utf8(&mut buf);
                        let piece_width = text_width(run.style, piece, size);
                        if !line.is_empty() && line.width + piece_width > max_width {
                            lines.push(std::mem::take(&mut line).runs);
                        }
                        line.push(run.style, piece, size);
                    }
                }
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line.runs);
    }
    lines
}

/// Split into alternating runs of whitespace and non-whitespace.
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            out.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[derive(Default)]
struct LineBuilder {
    runs: Vec<Run>,
    width: f32,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn push(&mut self, style: FontStyle, text: &str, size: f32) {
        self.width += text_width(style, text, size);
        match self.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.runs.push(Run {
                style,
                text: text.to_string(),
            }),
        }
    }
}

/// Flows blocks down the page, starting a new page when content would
/// cross the bottom margin.
pub struct PageCursor {
    pages: Vec<Page>,
    y: f32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN;
    }

    /// Advance by `lines` blank lines at `size`. Never breaks a page.
    pub fn move_down(&mut self, size: f32, lines: f32) {
        self.y += line_height(size) * lines;
    }

    pub fn text(&mut self, runs: &[Run], size: f32, color: Rgb) {
        let height = line_height(size);
        for line in wrap(runs, size, CONTENT_WIDTH) {
            if self.y + height > BOTTOM && !self.at_page_top() {
                self.add_page();
            }
            self.push(Block::Text(TextBlock {
                x: MARGIN,
                y: self.y,
                size,
                color,
                runs: line,
            }));
            self.y += height;
        }
    }

    pub fn image(
        &mut self,
        slot: AssetSlot,
        image: usize,
        natural: (u32, u32),
        bounds: BoundingBox,
        align: Align,
    ) {
        let size = fit(natural.0, natural.1, bounds);
        if self.y + size.height > BOTTOM && !self.at_page_top() {
            self.add_page();
        }
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => MARGIN + (CONTENT_WIDTH - size.width).max(0.0) / 2.0,
        };
        self.push(Block::Image(ImageBlock {
            slot,
            image,
            x,
            y: self.y,
            width: size.width,
            height: size.height,
        }));
        self.y += size.height;
    }

    pub fn finish(self) -> Vec<Page> {
        self.pages
    }

    fn at_page_top(&self) -> bool {
        self.y <= MARGIN
    }

    fn push(&mut self, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Vec<Run>]) -> Vec<String> {
        lines
            .iter()
            .map(|runs| runs.iter().map(|r| r.text.as_str()).collect())
            .collect()
    }

    fn assert_size(actual: BoundingBox, width: f32, height: f32) {
        assert!(
            (actual.width - width).abs() < 1e-3 && (actual.height - height).abs() < 1e-3,
            "expected {width}x{height}, got {actual:?}"
        );
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        assert_size(fit(1000, 500, BoundingBox::new(520.0, 360.0)), 520.0, 260.0);
        assert_size(fit(100, 400, BoundingBox::new(420.0, 120.0)), 30.0, 120.0);
    }

    #[test]
    fn fit_scales_small_images_up() {
        assert_size(fit(10, 10, BoundingBox::new(520.0, 280.0)), 280.0, 280.0);
    }

    #[test]
    fn wrap_keeps_short_rows_on_one_line() {
        let runs = [Run::bold("Carrier:"), Run::regular(" Acme Freight")];
        let lines = wrap(&runs, 10.0, CONTENT_WIDTH);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], runs.to_vec());
    }

    #[test]
    fn wrap_breaks_long_text_at_spaces() {
        let words = vec!["pallet"; 80].join(" ");
        let lines = wrap(&[Run::regular(words)], 10.0, 200.0);

        assert!(lines.len() > 1);
        for line in plain(&lines) {
            assert!(!line.starts_with(' '));
            assert!(!line.ends_with(' '));
            assert!(text_width(FontStyle::Regular, &line, 10.0) <= 200.0);
        }
    }

    #[test]
    fn wrap_honors_hard_breaks() {
        let lines = wrap(&[Run::regular("one\n\nthree")], 10.0, CONTENT_WIDTH);
        assert_eq!(plain(&lines), vec!["one", "", "three"]);
    }

    #[test]
    fn wrap_splits_oversized_words() {
        let word = "X".repeat(200);
        let lines = wrap(&[Run::regular(word.clone())], 10.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(plain(&lines).concat(), word);
    }

    #[test]
    fn wrap_drops_trailing_space_of_empty_value() {
        let lines = wrap(&[Run::bold("Stop #:"), Run::regular(" ")], 10.0, CONTENT_WIDTH);
        assert_eq!(plain(&lines), vec!["Stop #:"]);
    }

    #[test]
    fn cursor_breaks_pages_when_full() {
        let mut cursor = PageCursor::new();
        for _ in 0..100 {
            cursor.text(&[Run::regular("line")], 12.0, Rgb::BLACK);
        }
        let pages = cursor.finish();
        assert!(pages.len() > 1);
        for page in &pages {
            for block in &page.blocks {
                if let Block::Text(text) = block {
                    assert!(text.y + line_height(text.size) <= BOTTOM);
                }
            }
        }
    }

    #[test]
    fn cursor_moves_tall_images_to_a_fresh_page() {
        let mut cursor = PageCursor::new();
        cursor.move_down(12.0, 40.0);
        cursor.image(AssetSlot::BolImage, 0, (520, 360), BoundingBox::new(520.0, 360.0), Align::Center);
        let pages = cursor.finish();

        assert_eq!(pages.len(), 2);
        match &pages[1].blocks[0] {
            Block::Image(image) => {
                assert_eq!(image.y, MARGIN);
                assert_eq!(image.x, MARGIN + (CONTENT_WIDTH - 520.0) / 2.0);
            }
            other => panic!("expected image, got {other:?}"),
        }
    }
}
