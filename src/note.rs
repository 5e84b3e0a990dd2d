use serde::{Deserialize, Serialize};

/// Interchange form of a note: `(pitch, start_beat, length_beats, velocity)`.
pub type NoteTuple = (u8, f64, f64, u8);

/// Stable handle to a note in a [`NoteStore`]. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(u64);

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NoteTuple", into = "NoteTuple")]
pub struct Note {
    pub pitch: u8,
    pub start_beat: f64,
    pub length_beats: f64,
    pub velocity: u8,
    pub selected: bool,
}

impl Note {
    pub fn new(pitch: u8, start_beat: f64, length_beats: f64, velocity: u8) -> Self {
        Note {
            pitch,
            start_beat,
            length_beats,
            velocity,
            selected: false,
        }
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.length_beats
    }

    pub fn to_tuple(&self) -> NoteTuple {
        (self.pitch, self.start_beat, self.length_beats, self.velocity)
    }
}

impl From<NoteTuple> for Note {
    fn from((pitch, start_beat, length_beats, velocity): NoteTuple) -> Self {
        Note::new(pitch, start_beat, length_beats, velocity)
    }
}

impl From<Note> for NoteTuple {
    fn from(note: Note) -> Self {
        note.to_tuple()
    }
}

/// Outcome of [`NoteStore::clip_to_grid`].
#[derive(Debug, Default, PartialEq)]
pub struct ClipReport {
    pub removed: Vec<NoteId>,
    pub trimmed: Vec<NoteId>,
}

/// All notes of the editor, in insertion order.
///
/// The selection is not kept separately: it is the set of notes whose
/// `selected` flag is set.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: Vec<(NoteId, Note)>,
    next_id: u64,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, note: Note) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        self.notes.push((id, note));
        id
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|(i, _)| *i == id).map(|(_, n)| n)
    }

    pub fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|(i, _)| *i == id).map(|(_, n)| n)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NoteId, &Note)> {
        self.notes.iter().map(|(id, n)| (*id, n))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Remove every note matching `predicate`, returning their ids.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(&Note) -> bool) -> Vec<NoteId> {
        let mut removed = Vec::new();
        self.notes.retain(|(id, note)| {
            let hit = predicate(note);
            if hit {
                removed.push(*id);
            }
            !hit
        });
        removed
    }

    pub fn remove_selected(&mut self) -> Vec<NoteId> {
        self.remove_all(|n| n.selected)
    }

    pub fn selected(&self) -> Vec<NoteId> {
        self.iter().filter(|(_, n)| n.selected).map(|(id, _)| id).collect()
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.get(id).is_some_and(|n| n.selected)
    }

    /// Make `ids` the selection. Returns the notes whose flag changed.
    pub fn set_selection(&mut self, ids: &[NoteId]) -> Vec<NoteId> {
        let mut changed = Vec::new();
        for (id, note) in &mut self.notes {
            let want = ids.contains(id);
            if note.selected != want {
                note.selected = want;
                changed.push(*id);
            }
        }
        changed
    }

    pub fn select_only(&mut self, id: NoteId) -> Vec<NoteId> {
        self.set_selection(&[id])
    }

    pub fn clear_selection(&mut self) -> Vec<NoteId> {
        self.set_selection(&[])
    }

    /// Enforce the grid limit after it shrank: notes starting at or past
    /// `grid_beats` are removed, notes running past it are shortened.
    pub fn clip_to_grid(&mut self, grid_beats: f64) -> ClipReport {
        let removed = self.remove_all(|n| n.start_beat >= grid_beats);
        let mut trimmed = Vec::new();
        for (id, note) in &mut self.notes {
            if note.end_beat() > grid_beats {
                note.length_beats = grid_beats - note.start_beat;
                trimmed.push(*id);
            }
        }
        ClipReport { removed, trimmed }
    }
}
