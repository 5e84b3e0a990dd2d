use crate::geom::Rect;
use crate::note::NoteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStyle {
    Normal,
    Hovered,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    Normal,
    Hovered,
    Pressed,
}

/// What the editor asks its renderer to do. Issued as a consequence of a
/// state change, never polled.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderRequest {
    DrawNote {
        id: NoteId,
        rect: Rect,
        style: NoteStyle,
    },
    RemoveNote {
        id: NoteId,
    },
    SetNoteStyle {
        id: NoteId,
        style: NoteStyle,
    },
    DrawGhost {
        rect: Rect,
    },
    RemoveGhost,
    DrawMarquee {
        rect: Rect,
    },
    RemoveMarquee,
    SetKeyStyle {
        pitch: u8,
        style: KeyStyle,
    },
    /// Grid geometry changed: drop every drawn item and redraw the header,
    /// grid and keyboard. The items still alive are re-sent right after.
    Refresh,
}

/// Receiver of [`RenderRequest`]s.
pub trait RenderSink {
    fn request(&mut self, request: RenderRequest);
}

/// Records requests in order.
impl RenderSink for Vec<RenderRequest> {
    fn request(&mut self, request: RenderRequest) {
        self.push(request);
    }
}
