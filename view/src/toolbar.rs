use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// A single-row bar of `label value` fields.
///
/// The active field is highlighted. An optional right-aligned status string
/// (e.g. "INSERT") can be displayed.
pub struct Toolbar<'a> {
    fields: &'a [(&'a str, String)],
    active: Option<usize>,
    status: Option<(&'a str, Style)>,
    label_style: Style,
    value_style: Style,
    active_style: Style,
    separator: &'a str,
}

impl<'a> Toolbar<'a> {
    pub fn new(fields: &'a [(&'a str, String)]) -> Self {
        Self {
            fields,
            active: None,
            status: None,
            label_style: Style::default().fg(Color::DarkGray),
            value_style: Style::default().fg(Color::White),
            active_style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            separator: " │ ",
        }
    }

    pub fn active(mut self, index: Option<usize>) -> Self {
        self.active = index;
        self
    }

    pub fn status(mut self, text: &'a str, style: Style) -> Self {
        self.status = Some((text, style));
        self
    }

    pub fn separator(mut self, sep: &'a str) -> Self {
        self.separator = sep;
        self
    }

    fn field_width(label: &str, value: &str) -> usize {
        label.chars().count() + 1 + value.chars().count()
    }

    /// Hit-test: which field a click at (x, y) landed on. `area` is the Rect
    /// the toolbar was rendered into.
    pub fn field_at(
        x: u16,
        y: u16,
        area: Rect,
        fields: &[(&str, String)],
        separator: &str,
    ) -> Option<usize> {
        if y != area.y || x < area.x || x >= area.right() {
            return None;
        }
        let rel_x = (x - area.x) as usize;
        let sep_len = separator.chars().count();
        let mut pos = 0;
        for (i, (label, value)) in fields.iter().enumerate() {
            if i > 0 {
                pos += sep_len;
            }
            let width = Self::field_width(label, value);
            if rel_x >= pos && rel_x < pos + width {
                return Some(i);
            }
            pos += width;
        }
        None
    }
}

impl Widget for Toolbar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let y = area.y;
        let mut x = area.x;
        let mut put = |x: &mut u16, text: &str, style: Style| {
            for ch in text.chars() {
                if *x >= area.right() {
                    return;
                }
                if let Some(cell) = buf.cell_mut((*x, y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
                *x += 1;
            }
        };

        for (i, (label, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                put(&mut x, self.separator, self.label_style);
            }
            let value_style = if self.active == Some(i) {
                self.active_style
            } else {
                self.value_style
            };
            put(&mut x, label, self.label_style);
            put(&mut x, " ", self.label_style);
            put(&mut x, value, value_style);
        }

        if let Some((text, style)) = self.status {
            let len = text.chars().count() as u16;
            if len < area.width {
                let mut sx = area.right() - len;
                put(&mut sx, text, style);
            }
        }
    }
}
