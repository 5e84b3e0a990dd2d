mod scene;

pub use scene::Scene;

use std::io;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use pianoroll::editor::{Button, Buttons, Editor, EditorKey};
use pianoroll::error::ParseError;
use pianoroll::geom::Point;
use pianoroll::grid::LineKind;
use pianoroll::pitch::PitchAxis;
use pianoroll::render::{KeyStyle, NoteStyle};
use view::{
    Entry, EntryState, Keyboard, Lane, Roll, Ruler, Shape, Toolbar, VLine, Viewport,
    centered_rect,
};

const KEY_COLS: u16 = 5;
const SEP: &str = " │ ";
const MIN_PX_PER_COL: f64 = 1.0;
const MAX_PX_PER_COL: f64 = 125.0;
/// Pitch shown in the top row at startup.
const TOP_PITCH: i64 = 84;

// ---------------------------------------------------------------------------
// Toolbar fields
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Field {
    TimeSignature,
    Measures,
    DefaultLength,
    Quantize,
}

const FIELDS: [Field; 4] = [
    Field::TimeSignature,
    Field::Measures,
    Field::DefaultLength,
    Field::Quantize,
];

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::TimeSignature => "Time",
            Field::Measures => "Measures",
            Field::DefaultLength => "Length",
            Field::Quantize => "Quantize",
        }
    }

    fn value(self, editor: &Editor<Scene>) -> String {
        let grid = editor.grid();
        match self {
            Field::TimeSignature => grid.time_signature_text(),
            Field::Measures => grid.measures_text(),
            Field::DefaultLength => grid.default_length_text(),
            Field::Quantize => grid.quantize_text().to_string(),
        }
    }

    fn apply(self, editor: &mut Editor<Scene>, text: &str) -> Result<(), ParseError> {
        match self {
            Field::TimeSignature => editor.set_time_signature(text),
            Field::Measures => editor.set_measure_count(text),
            Field::DefaultLength => editor.set_default_length(text),
            Field::Quantize => editor.set_quantize_division(text),
        }
    }
}

struct Popup {
    field: Field,
    entry: EntryState,
}

#[derive(Default, Clone, Copy)]
struct Areas {
    toolbar: Rect,
    keys: Rect,
    grid: Rect,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct State {
    editor: Editor<Scene>,
    /// Horizontal scroll, in pixels from the grid origin.
    scroll_x: f64,
    /// Index of the pitch row shown at the top.
    scroll_row: u16,
    px_per_col: f64,
    popup: Option<Popup>,
    areas: Areas,
    quit: bool,
}

impl State {
    fn new(editor: Editor<Scene>) -> Self {
        let rows = editor.axis().total_rows() as i64;
        let px_per_col = editor.grid().snap_increment().unwrap_or(31.25) / 2.0;
        State {
            scroll_x: 0.0,
            scroll_row: (rows - 1 - TOP_PITCH).max(0) as u16,
            px_per_col: px_per_col.clamp(MIN_PX_PER_COL, MAX_PX_PER_COL),
            popup: None,
            areas: Areas::default(),
            quit: false,
            editor,
        }
    }

    fn viewport(&self) -> Viewport {
        let axis = self.editor.axis();
        Viewport {
            left: self.editor.grid().origin_x() + self.scroll_x,
            top: axis.header_height() + self.scroll_row as f64 * axis.row_height(),
            px_per_col: self.px_per_col,
            px_per_row: axis.row_height(),
        }
    }

    /// Editor pixel for a terminal cell. Cells in the keyboard column map
    /// onto the piano strip left of the grid.
    fn to_px(&self, col: u16, row: u16) -> Point {
        let (x, y) = self.viewport().cell_to_px(col, row, self.areas.grid);
        let keys = self.areas.keys;
        if col >= keys.x && col < keys.right() {
            let piano = self.editor.layout().piano_width;
            let x = (col - keys.x) as f64 * piano / keys.width as f64;
            return Point::new(x, y);
        }
        Point::new(x, y)
    }

    fn clamp_scroll(&mut self) {
        let visible = self.areas.grid.width as f64 * self.px_per_col;
        let max_x = (self.editor.grid().grid_width() - visible).max(0.0);
        self.scroll_x = self.scroll_x.clamp(0.0, max_x);

        let rows = self.editor.axis().total_rows() as u16;
        let max_row = rows.saturating_sub(self.areas.grid.height);
        self.scroll_row = self.scroll_row.min(max_row);
    }

    fn zoom(&mut self, factor: f64) {
        self.px_per_col = (self.px_per_col * factor).clamp(MIN_PX_PER_COL, MAX_PX_PER_COL);
        self.clamp_scroll();
    }

    fn toolbar_fields(&self) -> Vec<(&'static str, String)> {
        FIELDS
            .iter()
            .map(|f| (f.label(), f.value(&self.editor)))
            .collect()
    }

    fn open_popup(&mut self, field: Field) {
        self.popup = Some(Popup {
            field,
            entry: EntryState::new(field.label(), &field.value(&self.editor)),
        });
    }

    fn confirm_popup(&mut self) {
        let Some(popup) = self.popup.as_mut() else {
            return;
        };
        match popup.field.apply(&mut self.editor, &popup.entry.value) {
            Ok(()) => self.popup = None,
            Err(e) => popup.entry.reject(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal lifecycle
// ---------------------------------------------------------------------------

/// Run the editor in the terminal until the user quits, then hand it back.
pub fn run(editor: Editor<Scene>) -> anyhow::Result<Editor<Scene>> {
    let mut s = State::new(editor);

    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Logging to a terminal stderr would scribble over the alternate screen.
    let prev_log_level = log::max_level();
    if io::IsTerminal::is_terminal(&io::stderr()) {
        log::set_max_level(log::LevelFilter::Off);
    }

    let result = event_loop(&mut terminal, &mut s);

    log::set_max_level(prev_log_level);

    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    crossterm::terminal::disable_raw_mode()?;

    result?;
    Ok(s.editor)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    loop {
        render(terminal, s)?;
        if s.quit {
            break;
        }
        let ev = event::read()?;
        process_event(s, ev);
        while event::poll(Duration::ZERO)? {
            process_event(s, event::read()?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Event processing
// ---------------------------------------------------------------------------

fn process_event(s: &mut State, ev: Event) {
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
            {
                s.quit = true;
            } else if s.popup.is_some() {
                handle_popup_key(s, key.code);
            } else {
                handle_key(s, key.code);
            }
        }
        Event::Mouse(mouse) => {
            if s.popup.is_some() {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    s.popup = None;
                }
                return;
            }
            handle_mouse(s, mouse.kind, mouse.column, mouse.row);
        }
        _ => {}
    }
}

fn handle_popup_key(s: &mut State, code: KeyCode) {
    let Some(popup) = s.popup.as_mut() else {
        return;
    };
    let entry = &mut popup.entry;
    match code {
        KeyCode::Esc => s.popup = None,
        KeyCode::Enter => s.confirm_popup(),
        KeyCode::Char(c) => entry.insert(c),
        KeyCode::Backspace => entry.backspace(),
        KeyCode::Delete => entry.delete(),
        KeyCode::Left => entry.move_left(),
        KeyCode::Right => entry.move_right(),
        KeyCode::Home => entry.home(),
        KeyCode::End => entry.end(),
        _ => {}
    }
}

fn handle_key(s: &mut State, code: KeyCode) {
    match code {
        KeyCode::Char('b') => s.editor.key_down(EditorKey::ToggleInsert),
        KeyCode::Delete | KeyCode::Backspace => s.editor.key_down(EditorKey::Delete),
        KeyCode::Char('t') => s.open_popup(Field::TimeSignature),
        KeyCode::Char('m') => s.open_popup(Field::Measures),
        KeyCode::Char('l') => s.open_popup(Field::DefaultLength),
        KeyCode::Char('q') => s.open_popup(Field::Quantize),
        KeyCode::Char('+') | KeyCode::Char('=') => s.zoom(0.5),
        KeyCode::Char('-') => s.zoom(2.0),
        KeyCode::Left => {
            s.scroll_x -= 4.0 * s.px_per_col;
            s.clamp_scroll();
        }
        KeyCode::Right => {
            s.scroll_x += 4.0 * s.px_per_col;
            s.clamp_scroll();
        }
        KeyCode::Up => s.scroll_row = s.scroll_row.saturating_sub(3),
        KeyCode::Down => {
            s.scroll_row = s.scroll_row.saturating_add(3);
            s.clamp_scroll();
        }
        _ => {}
    }
}

fn to_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Primary,
        MouseButton::Right => Button::Secondary,
        MouseButton::Middle => Button::Middle,
    }
}

fn held(button: MouseButton) -> Buttons {
    Buttons {
        primary: button == MouseButton::Left,
        secondary: button == MouseButton::Right,
        middle: button == MouseButton::Middle,
    }
}

fn handle_mouse(s: &mut State, kind: MouseEventKind, x: u16, y: u16) {
    match kind {
        MouseEventKind::Down(button) => {
            let fields = s.toolbar_fields();
            if let Some(i) = Toolbar::field_at(x, y, s.areas.toolbar, &fields, SEP) {
                s.open_popup(FIELDS[i]);
                return;
            }
            let on_roll = s.areas.grid.contains((x, y).into())
                || s.areas.keys.contains((x, y).into());
            if on_roll {
                let pos = s.to_px(x, y);
                s.editor.pointer_down(pos, to_button(button));
            }
        }
        MouseEventKind::Drag(button) => {
            let pos = s.to_px(x, y);
            s.editor.pointer_move(pos, held(button));
        }
        MouseEventKind::Moved => {
            let pos = s.to_px(x, y);
            s.editor.pointer_move(pos, Buttons::NONE);
        }
        MouseEventKind::Up(button) => {
            let pos = s.to_px(x, y);
            s.editor.pointer_up(pos, to_button(button));
        }
        MouseEventKind::ScrollUp => s.scroll_row = s.scroll_row.saturating_sub(3),
        MouseEventKind::ScrollDown => {
            s.scroll_row = s.scroll_row.saturating_add(3);
            s.clamp_scroll();
        }
        MouseEventKind::ScrollLeft => {
            s.scroll_x -= 4.0 * s.px_per_col;
            s.clamp_scroll();
        }
        MouseEventKind::ScrollRight => {
            s.scroll_x += 4.0 * s.px_per_col;
            s.clamp_scroll();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn note_style(style: NoteStyle) -> Style {
    match style {
        NoteStyle::Normal => Style::default().fg(Color::Black).bg(Color::Cyan),
        NoteStyle::Hovered => Style::default().fg(Color::Black).bg(Color::LightCyan),
        NoteStyle::Selected => Style::default().fg(Color::Black).bg(Color::Yellow),
    }
}

fn key_style(pitch: u8, style: KeyStyle) -> Style {
    match style {
        KeyStyle::Pressed => Style::default().fg(Color::Black).bg(Color::Yellow),
        KeyStyle::Hovered => Style::default().fg(Color::Black).bg(Color::Gray),
        KeyStyle::Normal if PitchAxis::is_black_key(pitch) => {
            Style::default().fg(Color::White).bg(Color::Black)
        }
        KeyStyle::Normal => Style::default().fg(Color::Black).bg(Color::White),
    }
}

fn lane<'a>(axis: &PitchAxis, pitch: u8, style: Style, label: Option<&'a str>) -> Lane<'a> {
    Lane {
        y: axis.pitch_to_y(pitch),
        height: axis.row_height(),
        style,
        label,
    }
}

fn render(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    terminal.draw(|frame| {
        let area = frame.area();
        let [toolbar_area, roll_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let [ruler_row, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(roll_area);
        let [_, ruler_area] =
            Layout::horizontal([Constraint::Length(KEY_COLS), Constraint::Fill(1)])
                .areas(ruler_row);
        let [keys_area, grid_area] =
            Layout::horizontal([Constraint::Length(KEY_COLS), Constraint::Fill(1)]).areas(body);

        s.areas = Areas {
            toolbar: toolbar_area,
            keys: keys_area,
            grid: grid_area,
        };
        s.clamp_scroll();

        let fields = s.toolbar_fields();
        let active = s
            .popup
            .as_ref()
            .and_then(|p| FIELDS.iter().position(|f| *f == p.field));
        let mut toolbar = Toolbar::new(&fields).active(active).separator(SEP);
        if s.editor.mode().is_insert() {
            toolbar = toolbar.status(" INSERT ", Style::default().fg(Color::Black).bg(Color::Magenta));
        }
        frame.render_widget(toolbar, toolbar_area);

        let vp = s.viewport();
        let editor = &s.editor;
        let axis = editor.axis();
        let scene = editor.sink();

        let labels: Vec<(u8, Option<String>)> = (0..=axis.max_pitch())
            .map(|p| (p, axis.key_label(p)))
            .collect();
        let key_lanes: Vec<Lane> = labels
            .iter()
            .map(|(p, label)| {
                let style = key_style(*p, scene.key_style(*p));
                lane(axis, *p, style, label.as_deref())
            })
            .collect();
        let grid_lanes: Vec<Lane> = labels
            .iter()
            .map(|(p, _)| {
                let bg = if PitchAxis::is_black_key(*p) {
                    Color::Indexed(234)
                } else {
                    Color::Indexed(236)
                };
                lane(axis, *p, Style::default().bg(bg), None)
            })
            .collect();

        let grid_lines = editor.grid().grid_lines(vp.x_range(grid_area));
        let lines: Vec<VLine> = grid_lines
            .iter()
            .map(|l| match l.kind {
                LineKind::Bar(_) | LineKind::End => VLine {
                    x: l.x,
                    symbol: '│',
                    style: Style::default().fg(Color::White),
                },
                LineKind::Half => VLine {
                    x: l.x,
                    symbol: '┆',
                    style: Style::default().fg(Color::Gray),
                },
                LineKind::Division => VLine {
                    x: l.x,
                    symbol: '┊',
                    style: Style::default().fg(Color::DarkGray),
                },
            })
            .collect();
        let marks: Vec<(f64, String)> = grid_lines
            .iter()
            .filter_map(|l| match l.kind {
                LineKind::Bar(n) => Some((l.x, n.to_string())),
                _ => None,
            })
            .collect();

        let mut shapes: Vec<Shape> = scene
            .notes
            .values()
            .map(|(r, style)| Shape {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                symbol: ' ',
                style: note_style(*style),
                outline: false,
            })
            .collect();
        if let Some(r) = scene.ghost {
            shapes.push(Shape {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                symbol: ' ',
                style: Style::default().bg(Color::Magenta),
                outline: false,
            });
        }
        if let Some(r) = scene.marquee {
            shapes.push(Shape {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                symbol: '·',
                style: Style::default().fg(Color::White),
                outline: true,
            });
        }

        frame.render_widget(
            Ruler::new(vp, &marks).style(Style::default().fg(Color::Gray)),
            ruler_area,
        );
        frame.render_widget(Keyboard::new(vp, &key_lanes), keys_area);
        frame.render_widget(
            Roll::new(vp, &grid_lanes).lines(&lines).shapes(&shapes),
            grid_area,
        );

        let status = format!(
            " {} │ {} notes, {} selected │ b insert  t/m/l/q settings  del delete  +/- zoom  ^Q quit",
            editor.mode().name(),
            editor.notes().len(),
            editor.notes().selected().len()
        );
        frame.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
            status_area,
        );

        if let Some(popup) = &s.popup {
            render_popup(frame, area, popup);
        }
    })?;
    Ok(())
}

fn render_popup(frame: &mut ratatui::Frame, area: Rect, popup: &Popup) {
    let rect = centered_rect(48, 4, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" {} ", popup.field.label()));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    frame.render_widget(
        Entry::new(&popup.entry).style(Style::default().fg(Color::Yellow)),
        inner,
    );
}
