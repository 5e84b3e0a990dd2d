pub mod entry;
pub mod roll;
pub mod toolbar;

pub use entry::{Entry, EntryState};
pub use roll::{Keyboard, Lane, Roll, Ruler, Shape, VLine, Viewport};
pub use toolbar::Toolbar;

use ratatui::layout::Rect;

/// Compute a centered rectangle within `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
