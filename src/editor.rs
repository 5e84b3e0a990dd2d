use std::mem;

use crate::bounds::Bounds;
use crate::config::{EditorConfig, Layout};
use crate::error::ParseError;
use crate::geom::{Point, Rect};
use crate::grid::TimeGrid;
use crate::note::{Note, NoteId, NoteStore};
use crate::pitch::PitchAxis;
use crate::render::{KeyStyle, NoteStyle, RenderRequest, RenderSink};
use crate::snap::SnapEngine;

/// Slack, in snap steps, when looking for the last grid line before the end.
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
    Middle,
}

/// Buttons held during a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons {
    pub primary: bool,
    pub secondary: bool,
    pub middle: bool,
}

impl Buttons {
    pub const NONE: Self = Buttons {
        primary: false,
        secondary: false,
        middle: false,
    };
    pub const PRIMARY: Self = Buttons {
        primary: true,
        secondary: false,
        middle: false,
    };

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    ToggleInsert,
    Delete,
}

/// Anything on the canvas the pointer can be over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Note(NoteId),
    PianoKey(u8),
    Ghost,
    Marquee,
}

/// A selected note being dragged: where it is drawn now and the sub-grid
/// remainder the last snap cut off.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub id: NoteId,
    pub pos: Point,
    pub carry: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Insert mode; the ghost follows the pointer.
    InsertArmed { ghost: Rect },
    /// Button held in insert mode; the ghost's right edge follows the pointer.
    PlacingNote { ghost: Rect, min_width: f64 },
    MarqueeSelecting { anchor: Point, rect: Rect },
    DraggingSelection { items: Vec<DragItem> },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::InsertArmed { .. } => "insert",
            Mode::PlacingNote { .. } => "placing",
            Mode::MarqueeSelecting { .. } => "selecting",
            Mode::DraggingSelection { .. } => "dragging",
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Mode::InsertArmed { .. } | Mode::PlacingNote { .. })
    }

    pub fn ghost(&self) -> Option<Rect> {
        match self {
            Mode::InsertArmed { ghost } | Mode::PlacingNote { ghost, .. } => Some(*ghost),
            _ => None,
        }
    }
}

/// Everything the controller tracks between events.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub mode: Mode,
    /// Last pointer position seen.
    pub pointer: Point,
    pub hovered: Option<Element>,
    pub pressed_key: Option<u8>,
}

/// The piano roll controller.
///
/// Consumes pointer, keyboard and configuration input, mutates the
/// [`NoteStore`] and tells the renderer `R` what changed. All positions are in
/// the same pixel space as [`TimeGrid`] and [`PitchAxis`].
pub struct Editor<R: RenderSink> {
    layout: Layout,
    grid: TimeGrid,
    axis: PitchAxis,
    notes: NoteStore,
    state: EditorState,
    velocity: u8,
    sink: R,
}

impl<R: RenderSink> Editor<R> {
    /// Editor with the default grid settings.
    pub fn new(layout: Layout, sink: R) -> Self {
        let mut editor = Self::build(layout, sink);
        editor.refresh();
        editor
    }

    /// Editor configured from a config file. Invalid grid settings are
    /// logged and the defaults kept; seed notes outside the grid are skipped.
    pub fn from_config(config: &EditorConfig, sink: R) -> Self {
        let mut editor = Self::build(config.layout.clone(), sink);
        editor.velocity = config.grid.velocity.min(127);

        let g = &config.grid;
        if let Err(e) = editor.grid.set_time_signature(&g.time_signature) {
            log::warn!("Ignoring grid.time_signature: {e}");
        }
        if let Err(e) = editor.grid.set_measure_count(&g.measures) {
            log::warn!("Ignoring grid.measures: {e}");
        }
        if let Err(e) = editor.grid.set_quantize_division(&g.quantize) {
            log::warn!("Ignoring grid.quantize: {e}");
        }
        match &g.default_length {
            Some(text) => {
                if let Err(e) = editor.grid.set_default_length(text) {
                    log::warn!("Ignoring grid.default_length: {e}");
                    editor.grid.reset_default_length();
                }
            }
            None => editor.grid.reset_default_length(),
        }
        editor.refresh();

        for note in &config.notes {
            let placed = editor.insert_note(
                note.pitch as i32,
                note.start_beat,
                note.length_beats,
                note.velocity as i32,
            );
            if placed.is_none() {
                log::warn!("Skipping note {:?}: outside the grid", note.to_tuple());
            }
        }
        editor
    }

    fn build(layout: Layout, sink: R) -> Self {
        Editor {
            grid: TimeGrid::new(&layout),
            axis: PitchAxis::new(&layout),
            layout,
            notes: NoteStore::new(),
            state: EditorState::default(),
            velocity: 100,
            sink,
        }
    }

    // -- accessors --

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn axis(&self) -> &PitchAxis {
        &self.axis
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn mode(&self) -> &Mode {
        &self.state.mode
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    pub fn snapper(&self) -> SnapEngine {
        SnapEngine::new(&self.grid, &self.axis)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(&self.grid, &self.layout)
    }

    /// Where a note is drawn when it is not being dragged.
    pub fn note_rect(&self, note: &Note) -> Rect {
        Rect::new(
            self.grid.beat_to_x(note.start_beat),
            self.axis.pitch_to_y(note.pitch),
            self.grid.length_to_px(note.length_beats),
            self.axis.row_height(),
        )
    }

    /// Topmost element under `p`. Piano keys first, then notes (most
    /// recently added on top), then the marquee and the ghost.
    pub fn element_at(&self, p: Point) -> Option<Element> {
        if p.x >= 0.0 && p.x < self.layout.piano_width {
            return self.axis.pitch_at(p.y).map(Element::PianoKey);
        }
        let hit = self
            .notes
            .iter()
            .rev()
            .find(|(_, n)| self.note_rect(n).contains(p));
        if let Some((id, _)) = hit {
            return Some(Element::Note(id));
        }
        match &self.state.mode {
            Mode::MarqueeSelecting { rect, .. } if rect.contains(p) => Some(Element::Marquee),
            Mode::InsertArmed { ghost } | Mode::PlacingNote { ghost, .. } if ghost.contains(p) => {
                Some(Element::Ghost)
            }
            _ => None,
        }
    }

    // -- configuration --

    pub fn set_time_signature(&mut self, text: &str) -> Result<(), ParseError> {
        self.grid.set_time_signature(text)?;
        log::info!("Time signature {}", self.grid.time_signature_text());
        self.refresh();
        Ok(())
    }

    pub fn set_measure_count(&mut self, text: &str) -> Result<(), ParseError> {
        self.grid.set_measure_count(text)?;
        log::info!("Measures {}", self.grid.measures_text());
        self.refresh();
        Ok(())
    }

    pub fn set_quantize_division(&mut self, text: &str) -> Result<(), ParseError> {
        self.grid.set_quantize_division(text)?;
        log::info!("Quantize {}", self.grid.quantize_text());
        self.refresh();
        Ok(())
    }

    /// Takes effect on the next ghost; an armed ghost is rebuilt right away.
    pub fn set_default_length(&mut self, text: &str) -> Result<(), ParseError> {
        self.grid.set_default_length(text)?;
        log::info!("Default length {}", self.grid.default_length_text());
        if let Mode::InsertArmed { .. } = self.state.mode {
            let ghost = self.spawn_ghost();
            self.state.mode = Mode::InsertArmed { ghost };
        }
        Ok(())
    }

    /// Re-clip every note to the grid and redraw the scene from scratch.
    /// Open gestures are dropped; insert mode survives with a fresh ghost.
    fn refresh(&mut self) {
        let limit = self.grid.grid_beats();
        let report = self.notes.clip_to_grid(limit);
        if !report.removed.is_empty() || !report.trimmed.is_empty() {
            log::info!(
                "Grid is now {limit} beats: removed {} note(s), shortened {}",
                report.removed.len(),
                report.trimmed.len()
            );
        }
        self.notes.clear_selection();
        self.state.hovered = None;
        self.state.pressed_key = None;

        self.emit(RenderRequest::Refresh);
        let ids: Vec<NoteId> = self.notes.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.draw_note(id);
        }

        let mode = mem::take(&mut self.state.mode);
        self.state.mode = match mode {
            Mode::InsertArmed { .. } | Mode::PlacingNote { .. } => Mode::InsertArmed {
                ghost: self.spawn_ghost(),
            },
            _ => Mode::Idle,
        };
    }

    // -- notes --

    /// Place a note directly. Pitch and velocity are clamped; a start
    /// outside the grid or a non-positive length places nothing. A note
    /// running past the end of the grid is shortened.
    pub fn insert_note(
        &mut self,
        pitch: i32,
        start_beat: f64,
        length_beats: f64,
        velocity: i32,
    ) -> Option<NoteId> {
        let limit = self.grid.grid_beats();
        if !(start_beat.is_finite() && start_beat >= 0.0 && start_beat < limit) {
            return None;
        }
        if !(length_beats.is_finite() && length_beats > 0.0) {
            return None;
        }
        let note = Note::new(
            self.axis.clamp_pitch(pitch as f64),
            start_beat,
            length_beats.min(limit - start_beat),
            velocity.clamp(0, 127) as u8,
        );
        let id = self.notes.add(note);
        self.draw_note(id);
        Some(id)
    }

    // -- input --

    pub fn pointer_down(&mut self, pos: Point, button: Button) {
        if button != Button::Primary {
            return;
        }
        self.state.pointer = pos;
        let mode = mem::take(&mut self.state.mode);
        self.state.mode = match mode {
            Mode::Idle => self.press_idle(pos),
            Mode::InsertArmed { ghost } => {
                let changed = self.notes.clear_selection();
                self.restyle_notes(changed);
                log::debug!("Placing note at ({}, {})", ghost.x, ghost.y);
                Mode::PlacingNote {
                    ghost,
                    min_width: ghost.width,
                }
            }
            open => {
                log::debug!("Ignoring press while {}", open.name());
                open
            }
        };
    }

    pub fn pointer_move(&mut self, pos: Point, buttons: Buttons) {
        let previous = self.state.pointer;
        self.state.pointer = pos;
        let mode = mem::take(&mut self.state.mode);
        self.state.mode = match mode {
            Mode::Idle => {
                if buttons.is_empty() {
                    self.update_hover(pos);
                }
                Mode::Idle
            }
            Mode::InsertArmed { mut ghost } => {
                ghost.move_to(self.snapper().snap(self.bounds().clamp(pos)));
                self.emit(RenderRequest::DrawGhost { rect: ghost });
                Mode::InsertArmed { ghost }
            }
            Mode::PlacingNote {
                mut ghost,
                min_width,
            } => {
                let right = self.snapper().snap_x(pos.x).max(ghost.x + min_width);
                ghost.set_right(right);
                self.emit(RenderRequest::DrawGhost { rect: ghost });
                Mode::PlacingNote { ghost, min_width }
            }
            Mode::MarqueeSelecting { anchor, .. } => {
                let rect = Rect::spanning(anchor, self.bounds().clamp(pos));
                self.emit(RenderRequest::DrawMarquee { rect });
                self.select_intersecting(&rect);
                Mode::MarqueeSelecting { anchor, rect }
            }
            Mode::DraggingSelection { mut items } => {
                if buttons.primary {
                    self.drag_by(&mut items, pos.x - previous.x, pos.y - previous.y);
                }
                Mode::DraggingSelection { items }
            }
        };
    }

    pub fn pointer_up(&mut self, pos: Point, button: Button) {
        if button != Button::Primary {
            return;
        }
        self.state.pointer = pos;
        let mode = mem::take(&mut self.state.mode);
        self.state.mode = match mode {
            Mode::PlacingNote { ghost, .. } => {
                self.commit_ghost(ghost);
                Mode::InsertArmed {
                    ghost: self.spawn_ghost(),
                }
            }
            Mode::MarqueeSelecting { .. } => {
                self.emit(RenderRequest::RemoveMarquee);
                log::debug!("Selected {} note(s)", self.notes.selected().len());
                Mode::Idle
            }
            Mode::DraggingSelection { items } => {
                self.drop_items(items);
                Mode::Idle
            }
            other => {
                if let Some(pitch) = self.state.pressed_key.take() {
                    self.restyle_key(pitch);
                }
                other
            }
        };
    }

    pub fn key_down(&mut self, key: EditorKey) {
        match key {
            EditorKey::ToggleInsert => {
                let mode = mem::take(&mut self.state.mode);
                self.state.mode = match mode {
                    Mode::Idle => {
                        log::debug!("Insert mode on");
                        self.clear_hover();
                        Mode::InsertArmed {
                            ghost: self.spawn_ghost(),
                        }
                    }
                    Mode::InsertArmed { .. } => {
                        log::debug!("Insert mode off");
                        self.emit(RenderRequest::RemoveGhost);
                        Mode::Idle
                    }
                    Mode::PlacingNote { .. } => {
                        log::debug!("Insert mode off, placement discarded");
                        self.emit(RenderRequest::RemoveGhost);
                        Mode::Idle
                    }
                    open => open,
                };
            }
            EditorKey::Delete => match self.state.mode {
                Mode::Idle | Mode::InsertArmed { .. } => self.delete_selected(),
                _ => log::debug!("Ignoring delete while {}", self.state.mode.name()),
            },
        }
    }

    // -- transitions --

    fn press_idle(&mut self, pos: Point) -> Mode {
        match self.element_at(pos) {
            Some(Element::Note(id)) => {
                if !self.notes.is_selected(id) {
                    let changed = self.notes.select_only(id);
                    self.restyle_notes(changed);
                }
                let items: Vec<DragItem> = self
                    .notes
                    .iter()
                    .filter(|(_, n)| n.selected)
                    .map(|(id, n)| DragItem {
                        id,
                        pos: self.note_rect(n).top_left(),
                        carry: Point::default(),
                    })
                    .collect();
                log::debug!("Dragging {} note(s)", items.len());
                Mode::DraggingSelection { items }
            }
            Some(Element::PianoKey(pitch)) => {
                self.state.pressed_key = Some(pitch);
                self.restyle_key(pitch);
                Mode::Idle
            }
            _ => {
                let changed = self.notes.clear_selection();
                self.restyle_notes(changed);
                let anchor = self.bounds().clamp(pos);
                let rect = Rect::new(anchor.x, anchor.y, 0.0, 0.0);
                self.emit(RenderRequest::DrawMarquee { rect });
                Mode::MarqueeSelecting { anchor, rect }
            }
        }
    }

    fn select_intersecting(&mut self, rect: &Rect) {
        let ids: Vec<NoteId> = self
            .notes
            .iter()
            .filter(|(_, n)| self.note_rect(n).intersects(rect))
            .map(|(id, _)| id)
            .collect();
        let changed = self.notes.set_selection(&ids);
        self.restyle_notes(changed);
    }

    /// Move every dragged note by the pointer delta plus its carried
    /// remainder, clamped and snapped.
    fn drag_by(&mut self, items: &mut [DragItem], dx: f64, dy: f64) {
        let bounds = self.bounds();
        let snap = self.snapper();
        for item in items.iter_mut() {
            let moved = item.pos.offset(dx + item.carry.x, dy + item.carry.y);
            let clamped = bounds.clamp(moved);
            let snapped = snap.snap(clamped);
            item.carry = Point::new(clamped.x - snapped.x, clamped.y - snapped.y);
            item.pos = snapped;

            let Some(width) = self
                .notes
                .get(item.id)
                .map(|n| self.grid.length_to_px(n.length_beats))
            else {
                continue;
            };
            let rect = Rect::new(snapped.x, snapped.y, width, self.axis.row_height());
            self.emit(RenderRequest::DrawNote {
                id: item.id,
                rect,
                style: NoteStyle::Selected,
            });
        }
    }

    /// Write the dropped positions back into the notes, keeping each note
    /// on the keyboard and inside the grid.
    fn drop_items(&mut self, items: Vec<DragItem>) {
        let snap = self.snapper();
        let limit = self.grid.grid_beats();
        for item in items {
            let p = snap.snap(item.pos);
            let pitch = self.axis.clamp_pitch(self.axis.y_to_pitch(p.y));
            let mut start = self.grid.x_to_beat(p.x).max(0.0);
            let Some(length) = self.notes.get(item.id).map(|n| n.length_beats) else {
                continue;
            };
            if start >= limit {
                start = self.last_start_before(limit, length);
            }
            if let Some(note) = self.notes.get_mut(item.id) {
                note.pitch = pitch;
                note.start_beat = start;
                note.length_beats = length.min(limit - start);
                log::info!("Moved note {}: {:?}", item.id, note.to_tuple());
            }
            self.draw_note(item.id);
        }
    }

    /// Latest start for a note pushed against the end of the grid: the last
    /// snap line before it, or flush with the end when unquantized.
    fn last_start_before(&self, limit: f64, length: f64) -> f64 {
        match self.grid.snap_beats() {
            Some(step) => ((limit / step - EPS).ceil() - 1.0).max(0.0) * step,
            None => (limit - length).max(0.0),
        }
    }

    fn commit_ghost(&mut self, ghost: Rect) {
        let start = self.grid.x_to_beat(ghost.x);
        let pitch = self.axis.y_to_pitch(ghost.y).round() as i32;
        let length = self.grid.px_to_length(ghost.width);
        let velocity = self.velocity as i32;
        match self.insert_note(pitch, start, length, velocity) {
            Some(id) => {
                if let Some(note) = self.notes.get(id) {
                    log::info!("Placed note {id}: {:?}", note.to_tuple());
                }
            }
            None => log::debug!("Ghost at beat {start} is outside the grid, nothing placed"),
        }
    }

    /// Ghost at the bounded, snapped pointer with the default length.
    fn spawn_ghost(&mut self) -> Rect {
        let p = self.snapper().snap(self.bounds().clamp(self.state.pointer));
        let rect = Rect::new(
            p.x,
            p.y,
            self.grid.default_length_px(),
            self.axis.row_height(),
        );
        self.emit(RenderRequest::DrawGhost { rect });
        rect
    }

    fn delete_selected(&mut self) {
        let removed = self.notes.remove_selected();
        if removed.is_empty() {
            return;
        }
        if let Some(Element::Note(id)) = self.state.hovered
            && removed.contains(&id)
        {
            self.state.hovered = None;
        }
        for &id in &removed {
            self.emit(RenderRequest::RemoveNote { id });
        }
        log::info!("Deleted {} note(s)", removed.len());
    }

    /// Hover only tracks the pointer while idle.
    fn clear_hover(&mut self) {
        self.set_hovered(None);
    }

    fn update_hover(&mut self, pos: Point) {
        let over = self
            .element_at(pos)
            .filter(|e| matches!(e, Element::Note(_) | Element::PianoKey(_)));
        self.set_hovered(over);
    }

    fn set_hovered(&mut self, over: Option<Element>) {
        if over == self.state.hovered {
            return;
        }
        let previous = mem::replace(&mut self.state.hovered, over);
        for element in [previous, over].into_iter().flatten() {
            match element {
                Element::Note(id) => self.restyle_notes(vec![id]),
                Element::PianoKey(pitch) => self.restyle_key(pitch),
                Element::Ghost | Element::Marquee => {}
            }
        }
    }

    // -- render plumbing --

    fn emit(&mut self, request: RenderRequest) {
        self.sink.request(request);
    }

    fn note_style(&self, id: NoteId) -> NoteStyle {
        if self.notes.is_selected(id) {
            NoteStyle::Selected
        } else if self.state.hovered == Some(Element::Note(id)) {
            NoteStyle::Hovered
        } else {
            NoteStyle::Normal
        }
    }

    fn key_style(&self, pitch: u8) -> KeyStyle {
        if self.state.pressed_key == Some(pitch) {
            KeyStyle::Pressed
        } else if self.state.hovered == Some(Element::PianoKey(pitch)) {
            KeyStyle::Hovered
        } else {
            KeyStyle::Normal
        }
    }

    fn draw_note(&mut self, id: NoteId) {
        let Some(rect) = self.notes.get(id).map(|n| self.note_rect(n)) else {
            return;
        };
        let style = self.note_style(id);
        self.emit(RenderRequest::DrawNote { id, rect, style });
    }

    fn restyle_notes(&mut self, ids: Vec<NoteId>) {
        for id in ids {
            if self.notes.get(id).is_some() {
                let style = self.note_style(id);
                self.emit(RenderRequest::SetNoteStyle { id, style });
            }
        }
    }

    fn restyle_key(&mut self, pitch: u8) {
        let style = self.key_style(pitch);
        self.emit(RenderRequest::SetKeyStyle { pitch, style });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridSettings;

    type TestEditor = Editor<Vec<RenderRequest>>;

    fn editor() -> TestEditor {
        Editor::new(Layout::default(), Vec::new())
    }

    /// A point just inside the cell at (`beat`, `pitch`).
    fn at(e: &TestEditor, beat: f64, pitch: u8) -> Point {
        Point::new(e.grid().beat_to_x(beat) + 1.0, e.axis().pitch_to_y(pitch) + 1.0)
    }

    /// Press and release on the cell at (`beat`, `pitch`).
    fn click(e: &mut TestEditor, beat: f64, pitch: u8) {
        let p = at(e, beat, pitch);
        e.pointer_move(p, Buttons::NONE);
        e.pointer_down(p, Button::Primary);
        e.pointer_up(p, Button::Primary);
    }

    fn tuples(e: &TestEditor) -> Vec<(u8, f64, f64, u8)> {
        e.notes().iter().map(|(_, n)| n.to_tuple()).collect()
    }

    #[test]
    fn starts_idle_with_a_refresh() {
        let e = editor();
        assert_eq!(e.mode(), &Mode::Idle);
        assert_eq!(e.sink(), &vec![RenderRequest::Refresh]);
    }

    #[test]
    fn end_to_end_geometry() {
        let mut e = Editor::new(
            Layout {
                piano_width: 34.0,
                ..Layout::default()
            },
            Vec::new(),
        );
        assert_eq!(e.grid().beat_to_x(0.0), 36.0);
        assert_eq!(e.grid().beat_to_x(1.0), 98.5);

        let id = e.insert_note(72, 0.0, 0.25, 20).unwrap();
        let Some(RenderRequest::DrawNote { id: drawn, rect, .. }) = e.sink().last() else {
            panic!("expected a DrawNote");
        };
        assert_eq!(*drawn, id);
        assert_eq!(rect.x, 36.0);
        assert_eq!(rect.width, 15.625);
        assert_eq!(rect.y, e.axis().pitch_to_y(72));
    }

    #[test]
    fn insert_mode_places_a_note() {
        let mut e = editor();
        e.pointer_move(at(&e, 1.0, 72), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);

        let Some(ghost) = e.mode().ghost() else {
            panic!("expected a ghost");
        };
        assert_eq!(ghost.x, e.grid().beat_to_x(1.0));
        assert_eq!(ghost.y, e.axis().pitch_to_y(72));
        assert_eq!(ghost.width, 31.25);

        e.pointer_down(at(&e, 1.0, 72), Button::Primary);
        assert_eq!(e.mode().name(), "placing");
        let p = at(&e, 2.2, 60);
        e.pointer_move(p, Buttons::PRIMARY);
        e.pointer_up(p, Button::Primary);

        assert_eq!(tuples(&e), vec![(72, 1.0, 1.0, 100)]);
        assert_eq!(e.mode().name(), "insert");
        // The fresh ghost sits under the pointer.
        let ghost = e.mode().ghost().unwrap();
        assert_eq!(ghost.y, e.axis().pitch_to_y(60));
        assert_eq!(ghost.width, 31.25);
    }

    #[test]
    fn placing_never_shrinks_below_default_length() {
        let mut e = editor();
        e.pointer_move(at(&e, 4.0, 60), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        e.pointer_down(at(&e, 4.0, 60), Button::Primary);

        let left = at(&e, 1.0, 60);
        e.pointer_move(left, Buttons::PRIMARY);
        assert_eq!(e.mode().ghost().unwrap().width, 31.25);
        e.pointer_up(left, Button::Primary);

        assert_eq!(tuples(&e), vec![(60, 4.0, 0.5, 100)]);
    }

    #[test]
    fn ghost_tracking_is_clamped_to_the_grid() {
        let mut e = editor();
        e.pointer_move(Point::new(-50.0, -50.0), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        let ghost = e.mode().ghost().unwrap();
        assert_eq!((ghost.x, ghost.y), (34.0, 20.0));

        let y = e.axis().pitch_to_y(60) + 1.0;
        e.pointer_move(Point::new(5000.0, y), Buttons::NONE);
        let ghost = e.mode().ghost().unwrap();
        assert_eq!(ghost.x, e.grid().origin_x() + e.grid().grid_width());
        assert_eq!(ghost.x, 1034.0);
        assert_eq!(ghost.y, e.axis().pitch_to_y(60));
        assert!(e.notes().is_empty());
    }

    #[test]
    fn placing_past_the_end_is_trimmed_on_commit() {
        let mut e = editor();
        e.pointer_move(at(&e, 14.0, 60), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        e.pointer_down(at(&e, 14.0, 60), Button::Primary);

        let far = Point::new(5000.0, e.axis().pitch_to_y(60) + 1.0);
        e.pointer_move(far, Buttons::PRIMARY);
        let ghost = e.mode().ghost().unwrap();
        assert_eq!(ghost.x, e.grid().beat_to_x(14.0));
        // The stretch follows the pointer past the grid end.
        assert_eq!(ghost.x + ghost.width, 4971.5);

        e.pointer_up(far, Button::Primary);
        assert_eq!(tuples(&e), vec![(60, 14.0, 2.0, 100)]);
    }

    #[test]
    fn toggling_insert_off_while_placing_discards_the_note() {
        let mut e = editor();
        e.pointer_move(at(&e, 0.0, 60), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        e.pointer_down(at(&e, 0.0, 60), Button::Primary);
        e.pointer_move(at(&e, 3.0, 60), Buttons::PRIMARY);
        e.key_down(EditorKey::ToggleInsert);

        assert!(e.notes().is_empty());
        assert_eq!(e.mode(), &Mode::Idle);
        assert_eq!(e.sink().last(), Some(&RenderRequest::RemoveGhost));

        e.pointer_up(at(&e, 3.0, 60), Button::Primary);
        assert!(e.notes().is_empty());
        assert_eq!(e.mode(), &Mode::Idle);
    }

    #[test]
    fn stray_pointer_up_is_ignored() {
        let mut e = editor();
        e.sink_mut().clear();
        e.pointer_up(Point::new(300.0, 300.0), Button::Primary);
        assert_eq!(e.mode(), &Mode::Idle);
        assert!(e.sink().is_empty());
    }

    #[test]
    fn other_buttons_are_ignored() {
        let mut e = editor();
        e.pointer_down(Point::new(300.0, 300.0), Button::Secondary);
        assert_eq!(e.mode(), &Mode::Idle);
    }

    /// Origin at (0, 0), ten pixels per beat and per row.
    fn unit_editor() -> TestEditor {
        Editor::new(
            Layout {
                full_note_width: 40.0,
                header_height: 0.0,
                piano_width: 0.0,
                padding: 0.0,
                ..Layout::default()
            },
            Vec::new(),
        )
    }

    #[test]
    fn marquee_selects_by_intersection() {
        let mut e = unit_editor();
        let top = e.axis().max_pitch();
        let r1 = e.insert_note(top as i32, 0.0, 1.0, 100).unwrap();
        let r2 = e.insert_note(top as i32 - 2, 2.0, 1.0, 100).unwrap();
        assert_eq!(
            e.note_rect(e.notes().get(r1).unwrap()),
            Rect::new(0.0, 0.0, 10.0, 10.0)
        );
        assert_eq!(
            e.note_rect(e.notes().get(r2).unwrap()),
            Rect::new(20.0, 20.0, 10.0, 10.0)
        );

        e.pointer_down(Point::new(15.0, 15.0), Button::Primary);
        e.pointer_move(Point::new(0.0, 0.0), Buttons::PRIMARY);
        assert_eq!(
            e.mode(),
            &Mode::MarqueeSelecting {
                anchor: Point::new(15.0, 15.0),
                rect: Rect::new(0.0, 0.0, 15.0, 15.0),
            }
        );
        assert_eq!(e.notes().selected(), vec![r1]);
        e.pointer_up(Point::new(0.0, 0.0), Button::Primary);
        assert_eq!(e.sink().last(), Some(&RenderRequest::RemoveMarquee));
        assert_eq!(e.notes().selected(), vec![r1]);

        e.pointer_down(Point::new(35.0, 35.0), Button::Primary);
        assert!(e.notes().selected().is_empty());
        e.pointer_move(Point::new(0.0, 0.0), Buttons::PRIMARY);
        assert_eq!(e.notes().selected(), vec![r1, r2]);
        e.pointer_up(Point::new(0.0, 0.0), Button::Primary);
        assert_eq!(e.mode(), &Mode::Idle);
        assert_eq!(e.notes().selected(), vec![r1, r2]);
    }

    #[test]
    fn marquee_is_clamped_to_the_grid() {
        let mut e = editor();
        e.pointer_down(Point::new(100.0, 100.0), Button::Primary);
        e.pointer_move(Point::new(-50.0, 0.0), Buttons::PRIMARY);
        let Mode::MarqueeSelecting { rect, .. } = e.mode() else {
            panic!("expected a marquee");
        };
        assert_eq!(rect.x, 34.0);
        assert_eq!(rect.y, 22.0);
    }

    #[test]
    fn pressing_a_selected_note_drags_the_whole_selection() {
        let mut e = editor();
        let a = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        let b = e.insert_note(64, 2.0, 1.0, 100).unwrap();
        let c = e.insert_note(67, 8.0, 1.0, 100).unwrap();

        // Marquee over a and b only.
        let from = Point::new(e.grid().beat_to_x(3.5), e.axis().pitch_to_y(65));
        let to = Point::new(e.grid().beat_to_x(0.0) + 1.0, e.axis().pitch_to_y(59));
        e.pointer_down(from, Button::Primary);
        e.pointer_move(to, Buttons::PRIMARY);
        e.pointer_up(to, Button::Primary);
        assert_eq!(e.notes().selected(), vec![a, b]);

        // Drag a by one beat right and one row up; b follows.
        let start = at(&e, 0.0, 60);
        e.pointer_down(start, Button::Primary);
        assert_eq!(e.mode().name(), "dragging");
        let end = start.offset(62.5, -10.0);
        e.pointer_move(end, Buttons::PRIMARY);
        e.pointer_up(end, Button::Primary);

        assert_eq!(e.mode(), &Mode::Idle);
        assert_eq!(e.notes().get(a).unwrap().to_tuple(), (61, 1.0, 1.0, 100));
        assert_eq!(e.notes().get(b).unwrap().to_tuple(), (65, 3.0, 1.0, 100));
        assert_eq!(e.notes().get(c).unwrap().to_tuple(), (67, 8.0, 1.0, 100));
        assert_eq!(e.notes().selected(), vec![a, b]);
    }

    #[test]
    fn pressing_an_unselected_note_collapses_the_selection() {
        let mut e = editor();
        let a = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        let b = e.insert_note(64, 2.0, 1.0, 100).unwrap();
        click(&mut e, 0.0, 60);
        assert_eq!(e.notes().selected(), vec![a]);

        click(&mut e, 2.0, 64);
        assert_eq!(e.notes().selected(), vec![b]);
        assert!(e.sink().contains(&RenderRequest::SetNoteStyle {
            id: a,
            style: NoteStyle::Normal,
        }));
    }

    #[test]
    fn clicking_empty_grid_clears_the_selection() {
        let mut e = editor();
        let a = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        click(&mut e, 0.0, 60);
        assert_eq!(e.notes().selected(), vec![a]);
        click(&mut e, 10.0, 90);
        assert!(e.notes().selected().is_empty());
    }

    #[test]
    fn drag_carries_the_sub_grid_remainder() {
        let mut e = editor();
        let id = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        let mut p = at(&e, 0.0, 60);
        e.pointer_down(p, Button::Primary);
        // Four 10px steps: each alone is below the 31.25px increment.
        for _ in 0..4 {
            p = p.offset(10.0, 0.0);
            e.pointer_move(p, Buttons::PRIMARY);
        }
        e.pointer_up(p, Button::Primary);
        assert_eq!(e.notes().get(id).unwrap().start_beat, 0.5);
    }

    #[test]
    fn drag_without_button_does_not_move() {
        let mut e = editor();
        let id = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        let p = at(&e, 0.0, 60);
        e.pointer_down(p, Button::Primary);
        e.pointer_move(p.offset(200.0, 0.0), Buttons::NONE);
        e.pointer_up(p.offset(200.0, 0.0), Button::Primary);
        assert_eq!(e.notes().get(id).unwrap().start_beat, 0.0);
    }

    #[test]
    fn dropped_notes_stay_on_the_grid() {
        let mut e = editor();
        let id = e.insert_note(60, 14.0, 1.0, 100).unwrap();
        let p = at(&e, 14.0, 60);
        e.pointer_down(p, Button::Primary);
        let far = p.offset(10_000.0, 100_000.0);
        e.pointer_move(far, Buttons::PRIMARY);
        e.pointer_up(far, Button::Primary);

        // Pulled back to the last eighth before beat 16, trimmed to fit,
        // and pinned to the lowest pitch.
        assert_eq!(e.notes().get(id).unwrap().to_tuple(), (0, 15.5, 0.5, 100));
    }

    #[test]
    fn dropped_note_without_quantize_is_flush_with_the_end() {
        let mut e = editor();
        e.set_quantize_division("0").unwrap();
        let id = e.insert_note(60, 10.0, 2.0, 100).unwrap();
        let p = at(&e, 10.0, 60);
        e.pointer_down(p, Button::Primary);
        let far = p.offset(10_000.0, 0.0);
        e.pointer_move(far, Buttons::PRIMARY);
        e.pointer_up(far, Button::Primary);
        assert_eq!(e.notes().get(id).unwrap().to_tuple(), (60, 14.0, 2.0, 100));
    }

    #[test]
    fn delete_removes_exactly_the_selection() {
        let mut e = editor();
        let a = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        let b = e.insert_note(62, 1.0, 1.0, 100).unwrap();
        let c = e.insert_note(64, 2.0, 1.0, 100).unwrap();
        click(&mut e, 1.0, 62);
        e.sink_mut().clear();

        e.key_down(EditorKey::Delete);

        assert_eq!(e.notes().len(), 2);
        assert!(e.notes().get(b).is_none());
        assert!(e.notes().get(a).is_some() && e.notes().get(c).is_some());
        assert_eq!(e.sink(), &vec![RenderRequest::RemoveNote { id: b }]);
    }

    #[test]
    fn shrinking_the_grid_clips_notes() {
        let mut e = editor();
        let late = e.insert_note(60, 15.0, 2.0, 100).unwrap();
        let long = e.insert_note(62, 6.0, 4.0, 100).unwrap();
        e.sink_mut().clear();

        e.set_measure_count("2").unwrap();

        assert!(e.notes().get(late).is_none());
        assert_eq!(e.notes().get(long).unwrap().length_beats, 2.0);
        assert_eq!(e.sink()[0], RenderRequest::Refresh);
        assert!(matches!(
            e.sink()[1],
            RenderRequest::DrawNote { id, .. } if id == long
        ));
        assert_eq!(e.sink().len(), 2);
    }

    #[test]
    fn time_signature_change_clips_notes() {
        let mut e = editor();
        e.insert_note(60, 9.0, 1.0, 100).unwrap();
        e.set_time_signature("2/4").unwrap();
        assert!(e.notes().is_empty());
        assert_eq!(e.grid().grid_beats(), 8.0);
    }

    #[test]
    fn rejected_setting_changes_nothing() {
        let mut e = editor();
        e.insert_note(60, 15.0, 1.0, 100).unwrap();
        e.sink_mut().clear();

        assert!(matches!(
            e.set_quantize_division("1/0"),
            Err(ParseError::ZeroDenominator { .. })
        ));
        assert!(e.set_measure_count("-2").is_err());
        assert!(e.set_time_signature("4/4/4").is_err());
        assert!(e.set_default_length("x").is_err());

        assert_eq!(e.grid().snap_increment(), Some(31.25));
        assert_eq!(e.grid().grid_beats(), 16.0);
        assert_eq!(e.notes().len(), 1);
        assert!(e.sink().is_empty());
    }

    #[test]
    fn refresh_keeps_insert_mode_with_a_new_ghost() {
        let mut e = editor();
        e.pointer_move(at(&e, 1.0, 60), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        e.pointer_down(at(&e, 1.0, 60), Button::Primary);
        e.sink_mut().clear();

        e.set_quantize_division("1/4").unwrap();

        assert_eq!(e.mode().name(), "insert");
        assert_eq!(e.sink().first(), Some(&RenderRequest::Refresh));
        assert!(matches!(e.sink().last(), Some(RenderRequest::DrawGhost { .. })));
    }

    #[test]
    fn refresh_cancels_a_marquee() {
        let mut e = editor();
        e.pointer_down(at(&e, 1.0, 60), Button::Primary);
        e.set_measure_count("8").unwrap();
        assert_eq!(e.mode(), &Mode::Idle);
    }

    #[test]
    fn default_length_rebuilds_an_armed_ghost() {
        let mut e = editor();
        e.pointer_move(at(&e, 1.0, 60), Buttons::NONE);
        e.key_down(EditorKey::ToggleInsert);
        e.set_default_length("1/4").unwrap();
        assert_eq!(e.mode().ghost().unwrap().width, 62.5);
    }

    #[test]
    fn insert_note_clamps_and_rejects() {
        let mut e = editor();
        assert!(e.insert_note(60, 16.0, 1.0, 100).is_none());
        assert!(e.insert_note(60, -1.0, 1.0, 100).is_none());
        assert!(e.insert_note(60, 1.0, 0.0, 100).is_none());

        let id = e.insert_note(300, 15.0, 4.0, -5).unwrap();
        assert_eq!(e.notes().get(id).unwrap().to_tuple(), (120, 15.0, 1.0, 0));
    }

    #[test]
    fn hover_styles_notes() {
        let mut e = editor();
        let id = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        e.sink_mut().clear();

        e.pointer_move(at(&e, 0.0, 60), Buttons::NONE);
        e.pointer_move(at(&e, 8.0, 90), Buttons::NONE);

        assert_eq!(
            e.sink(),
            &vec![
                RenderRequest::SetNoteStyle {
                    id,
                    style: NoteStyle::Hovered,
                },
                RenderRequest::SetNoteStyle {
                    id,
                    style: NoteStyle::Normal,
                },
            ]
        );
    }

    #[test]
    fn insert_mode_drops_the_hover() {
        let mut e = editor();
        let id = e.insert_note(60, 0.0, 1.0, 100).unwrap();
        e.pointer_move(at(&e, 0.0, 60), Buttons::NONE);
        assert_eq!(e.state().hovered, Some(Element::Note(id)));
        e.sink_mut().clear();

        e.key_down(EditorKey::ToggleInsert);
        assert_eq!(e.state().hovered, None);
        assert_eq!(
            e.sink()[0],
            RenderRequest::SetNoteStyle {
                id,
                style: NoteStyle::Normal,
            }
        );

        e.pointer_move(at(&e, 8.0, 90), Buttons::NONE);
        assert!(!e.sink().contains(&RenderRequest::SetNoteStyle {
            id,
            style: NoteStyle::Hovered,
        }));
    }

    #[test]
    fn piano_keys_do_not_start_a_marquee() {
        let mut e = editor();
        let key = Point::new(5.0, e.axis().pitch_to_y(60) + 2.0);
        assert_eq!(e.element_at(key), Some(Element::PianoKey(60)));
        e.sink_mut().clear();

        e.pointer_down(key, Button::Primary);
        assert_eq!(e.mode(), &Mode::Idle);
        assert_eq!(
            e.sink().last(),
            Some(&RenderRequest::SetKeyStyle {
                pitch: 60,
                style: KeyStyle::Pressed,
            })
        );
        e.pointer_up(key, Button::Primary);
        assert_eq!(
            e.sink().last(),
            Some(&RenderRequest::SetKeyStyle {
                pitch: 60,
                style: KeyStyle::Normal,
            })
        );
    }

    #[test]
    fn from_config_applies_grid_and_seeds() {
        let config = EditorConfig {
            grid: GridSettings {
                time_signature: "6/4".into(),
                measures: "5".into(),
                quantize: "1/16".into(),
                default_length: None,
                velocity: 90,
            },
            layout: Layout::default(),
            notes: vec![
                Note::new(72, 0.0, 0.25, 20),
                Note::new(73, 1.0, 0.25, 20),
                Note::new(74, 99.0, 0.25, 20),
            ],
        };
        let e = Editor::from_config(&config, Vec::new());
        assert_eq!(e.grid().grid_beats(), 30.0);
        assert_eq!(e.grid().snap_increment(), Some(15.625));
        assert_eq!(e.grid().default_length_text(), "1/16");
        assert_eq!(e.velocity(), 90);
        assert_eq!(e.notes().len(), 2);
    }

    #[test]
    fn from_config_keeps_defaults_for_bad_values() {
        let config = EditorConfig {
            grid: GridSettings {
                time_signature: "6/0".into(),
                measures: "many".into(),
                ..GridSettings::default()
            },
            ..EditorConfig::default()
        };
        let e = Editor::from_config(&config, Vec::new());
        assert_eq!(e.grid().time_signature_text(), "4/4");
        assert_eq!(e.grid().measures(), 4.0);
    }
}
