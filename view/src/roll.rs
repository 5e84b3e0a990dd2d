use std::ops::Range;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

/// Maps a pixel-space canvas onto terminal cells.
///
/// `left`/`top` are the pixel coordinates shown at the area's top-left cell.
/// One column covers `px_per_col` pixels, one row `px_per_row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub px_per_col: f64,
    pub px_per_row: f64,
}

impl Viewport {
    /// Column showing pixel `x`, if it falls inside `area`.
    pub fn col_of(&self, x: f64, area: Rect) -> Option<u16> {
        let col = ((x - self.left) / self.px_per_col).floor();
        (col >= 0.0 && col < area.width as f64).then(|| area.x + col as u16)
    }

    /// Pixels spanned horizontally by `area`.
    pub fn x_range(&self, area: Rect) -> Range<f64> {
        self.left..self.left + area.width as f64 * self.px_per_col
    }

    /// Pixel for a cell: the left edge of its column and the middle of its
    /// row. Cells outside `area` extrapolate past its edges.
    pub fn cell_to_px(&self, col: u16, row: u16, area: Rect) -> (f64, f64) {
        let dx = col as f64 - area.x as f64;
        let dy = row as f64 - area.y as f64;
        (
            self.left + dx * self.px_per_col,
            self.top + (dy + 0.5) * self.px_per_row,
        )
    }

    /// Half-open column range covered by `[x, x + width)`, clipped to `area`.
    fn col_span(&self, x: f64, width: f64, area: Rect) -> Option<(u16, u16)> {
        let first = ((x - self.left) / self.px_per_col).floor().max(0.0);
        let last = ((x + width - self.left) / self.px_per_col).ceil();
        let last = last.max(first + 1.0).min(area.width as f64);
        (first < last).then(|| (area.x + first as u16, area.x + last as u16))
    }

    fn row_span(&self, y: f64, height: f64, area: Rect) -> Option<(u16, u16)> {
        let first = ((y - self.top) / self.px_per_row).floor().max(0.0);
        let last = ((y + height - self.top) / self.px_per_row).ceil();
        let last = last.max(first + 1.0).min(area.height as f64);
        (first < last).then(|| (area.y + first as u16, area.y + last as u16))
    }
}

/// A horizontal band: one pitch row.
pub struct Lane<'a> {
    pub y: f64,
    pub height: f64,
    pub style: Style,
    pub label: Option<&'a str>,
}

/// A vertical line at pixel `x`.
pub struct VLine {
    pub x: f64,
    pub symbol: char,
    pub style: Style,
}

/// A filled (or outlined) pixel rectangle.
pub struct Shape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub symbol: char,
    pub style: Style,
    pub outline: bool,
}

fn lane_at<'l, 'a>(lanes: &'l [Lane<'a>], y: f64) -> Option<&'l Lane<'a>> {
    lanes.iter().find(|l| y >= l.y && y < l.y + l.height)
}

fn put(buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch);
        cell.set_style(style);
    }
}

/// The note canvas: lane backgrounds, then vertical lines, then shapes in
/// the order given (later shapes on top).
pub struct Roll<'a> {
    viewport: Viewport,
    lanes: &'a [Lane<'a>],
    lines: &'a [VLine],
    shapes: &'a [Shape],
}

impl<'a> Roll<'a> {
    pub fn new(viewport: Viewport, lanes: &'a [Lane<'a>]) -> Self {
        Self {
            viewport,
            lanes,
            lines: &[],
            shapes: &[],
        }
    }

    pub fn lines(mut self, lines: &'a [VLine]) -> Self {
        self.lines = lines;
        self
    }

    pub fn shapes(mut self, shapes: &'a [Shape]) -> Self {
        self.shapes = shapes;
        self
    }
}

impl Widget for Roll<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let vp = self.viewport;

        for row in area.y..area.bottom() {
            let (_, y) = vp.cell_to_px(area.x, row, area);
            let style = lane_at(self.lanes, y).map_or(Style::default(), |l| l.style);
            for col in area.x..area.right() {
                put(buf, col, row, ' ', style);
            }
        }

        for line in self.lines {
            let Some(col) = vp.col_of(line.x, area) else {
                continue;
            };
            for row in area.y..area.bottom() {
                if let Some(cell) = buf.cell_mut((col, row)) {
                    cell.set_char(line.symbol);
                    cell.set_fg(line.style.fg.unwrap_or_default());
                }
            }
        }

        for shape in self.shapes {
            let (Some((c0, c1)), Some((r0, r1))) = (
                vp.col_span(shape.x, shape.width, area),
                vp.row_span(shape.y, shape.height, area),
            ) else {
                continue;
            };
            for row in r0..r1 {
                for col in c0..c1 {
                    let edge = row == r0 || row + 1 == r1 || col == c0 || col + 1 == c1;
                    if !shape.outline || edge {
                        put(buf, col, row, shape.symbol, shape.style);
                    }
                }
            }
        }
    }
}

/// Piano keyboard column: one key per lane, labelled where the lane has one.
pub struct Keyboard<'a> {
    viewport: Viewport,
    lanes: &'a [Lane<'a>],
}

impl<'a> Keyboard<'a> {
    pub fn new(viewport: Viewport, lanes: &'a [Lane<'a>]) -> Self {
        Self { viewport, lanes }
    }
}

impl Widget for Keyboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        for row in area.y..area.bottom() {
            let (_, y) = self.viewport.cell_to_px(area.x, row, area);
            let Some(lane) = lane_at(self.lanes, y) else {
                continue;
            };
            let mut label = lane.label.unwrap_or("").chars();
            for col in area.x..area.right() {
                put(buf, col, row, label.next().unwrap_or(' '), lane.style);
            }
        }
    }
}

/// Labels along the top of the canvas, e.g. measure numbers.
pub struct Ruler<'a> {
    viewport: Viewport,
    marks: &'a [(f64, String)],
    style: Style,
}

impl<'a> Ruler<'a> {
    pub fn new(viewport: Viewport, marks: &'a [(f64, String)]) -> Self {
        Self {
            viewport,
            marks,
            style: Style::default(),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Widget for Ruler<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        for col in area.x..area.right() {
            put(buf, col, area.y, ' ', self.style);
        }
        for (x, label) in self.marks {
            let Some(start) = self.viewport.col_of(*x, area) else {
                continue;
            };
            for (i, ch) in label.chars().enumerate() {
                let col = start + i as u16;
                if col >= area.right() {
                    break;
                }
                put(buf, col, area.y, ch, self.style);
            }
        }
    }
}
