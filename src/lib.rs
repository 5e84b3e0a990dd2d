//! Piano roll editing core: time grid and pitch axis geometry, snapping,
//! the note store and the interaction controller that drives a renderer.

pub mod bounds;
pub mod config;
pub mod editor;
pub mod error;
pub mod geom;
pub mod grid;
pub mod note;
pub mod pitch;
pub mod render;
pub mod snap;

pub use config::{EditorConfig, GridSettings, Layout};
pub use editor::{Button, Buttons, Editor, EditorKey, EditorState, Element, Mode};
pub use error::ParseError;
pub use geom::{Point, Rect};
pub use grid::TimeGrid;
pub use note::{Note, NoteId, NoteStore, NoteTuple};
pub use pitch::PitchAxis;
pub use render::{KeyStyle, NoteStyle, RenderRequest, RenderSink};
pub use snap::SnapEngine;
