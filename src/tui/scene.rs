use std::collections::{BTreeMap, HashMap};

use pianoroll::geom::Rect;
use pianoroll::note::NoteId;
use pianoroll::render::{KeyStyle, NoteStyle, RenderRequest, RenderSink};

/// Everything the editor has asked to be drawn, kept until the next frame.
#[derive(Debug, Default)]
pub struct Scene {
    pub notes: BTreeMap<NoteId, (Rect, NoteStyle)>,
    pub ghost: Option<Rect>,
    pub marquee: Option<Rect>,
    pub keys: HashMap<u8, KeyStyle>,
    /// Bumped on every `Refresh`.
    pub generation: u64,
}

impl Scene {
    pub fn key_style(&self, pitch: u8) -> KeyStyle {
        self.keys.get(&pitch).copied().unwrap_or(KeyStyle::Normal)
    }
}

impl RenderSink for Scene {
    fn request(&mut self, request: RenderRequest) {
        match request {
            RenderRequest::DrawNote { id, rect, style } => {
                self.notes.insert(id, (rect, style));
            }
            RenderRequest::RemoveNote { id } => {
                self.notes.remove(&id);
            }
            RenderRequest::SetNoteStyle { id, style } => {
                if let Some(entry) = self.notes.get_mut(&id) {
                    entry.1 = style;
                }
            }
            RenderRequest::DrawGhost { rect } => self.ghost = Some(rect),
            RenderRequest::RemoveGhost => self.ghost = None,
            RenderRequest::DrawMarquee { rect } => self.marquee = Some(rect),
            RenderRequest::RemoveMarquee => self.marquee = None,
            RenderRequest::SetKeyStyle { pitch, style } => {
                if style == KeyStyle::Normal {
                    self.keys.remove(&pitch);
                } else {
                    self.keys.insert(pitch, style);
                }
            }
            RenderRequest::Refresh => {
                self.notes.clear();
                self.ghost = None;
                self.marquee = None;
                self.keys.clear();
                self.generation += 1;
            }
        }
    }
}
