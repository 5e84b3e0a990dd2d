use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// State for a labelled one-line entry that can show a rejection message.
#[derive(Debug, Clone)]
pub struct EntryState {
    pub label: String,
    pub value: String,
    /// Byte offset into `value`.
    pub cursor: usize,
    pub error: Option<String>,
}

impl EntryState {
    pub fn new(label: &str, initial: &str) -> Self {
        Self {
            label: label.to_string(),
            value: initial.to_string(),
            cursor: initial.len(),
            error: None,
        }
    }

    pub fn insert(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.error = None;
    }

    pub fn backspace(&mut self) {
        if let Some((prev, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.remove(prev);
            self.cursor = prev;
            self.error = None;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
            self.error = None;
        }
    }

    pub fn move_left(&mut self) {
        if let Some((prev, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }

    /// Keep the typed text and show why it was rejected.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

/// `label: value` with a block cursor on the first row, and the error
/// message (if any) on the second.
pub struct Entry<'a> {
    state: &'a EntryState,
    style: Style,
    cursor_style: Style,
    error_style: Style,
}

impl<'a> Entry<'a> {
    pub fn new(state: &'a EntryState) -> Self {
        Self {
            state,
            style: Style::default(),
            cursor_style: Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
            error_style: Style::default().fg(Color::Red),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Widget for Entry<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let y = area.y;
        let mut x = area.x;
        let mut put = |x: &mut u16, y: u16, ch: char, style: Style| {
            if *x < area.right()
                && let Some(cell) = buf.cell_mut((*x, y))
            {
                cell.set_char(ch);
                cell.set_style(style);
            }
            *x += 1;
        };

        for ch in self.state.label.chars().chain(": ".chars()) {
            put(&mut x, y, ch, self.style);
        }
        for (i, ch) in self.state.value.char_indices() {
            let style = if i == self.state.cursor {
                self.cursor_style
            } else {
                self.style
            };
            put(&mut x, y, ch, style);
        }
        if self.state.cursor >= self.state.value.len() {
            put(&mut x, y, ' ', self.cursor_style);
        }

        if let Some(error) = self.state.error.as_deref().filter(|_| area.height >= 2) {
            let mut ex = area.x;
            for ch in error.chars() {
                put(&mut ex, y + 1, ch, self.error_style);
            }
        }
    }
}
