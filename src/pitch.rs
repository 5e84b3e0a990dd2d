use crate::config::Layout;

const NOTES_IN_OCTAVE: i32 = 12;
/// Most octaves an axis can span (121 rows).
pub const MAX_OCTAVES: i64 = 10;
const NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Vertical (pitch) axis of the roll: one row per MIDI pitch, highest pitch
/// at the top, rows starting right below the header.
#[derive(Debug, Clone)]
pub struct PitchAxis {
    header_height: f64,
    row_height: f64,
    start_octave: i32,
    total_rows: u32,
}

impl PitchAxis {
    pub fn new(layout: &Layout) -> Self {
        let octaves =
            (layout.end_octave as i64 - layout.start_octave as i64).clamp(0, MAX_OCTAVES);
        PitchAxis {
            header_height: layout.header_height,
            row_height: layout.row_height,
            start_octave: layout.start_octave,
            total_rows: (octaves * NOTES_IN_OCTAVE as i64 + 1) as u32,
        }
    }

    pub fn pitch_to_y(&self, pitch: u8) -> f64 {
        self.header_height + self.row_height * (self.total_rows as f64 - pitch as f64 - 1.0)
    }

    /// Inverse of [`pitch_to_y`](Self::pitch_to_y). Fractional between rows.
    pub fn y_to_pitch(&self, y: f64) -> f64 {
        self.total_rows as f64 - 1.0 - (y - self.header_height) / self.row_height
    }

    /// Pitch of the row containing `y`, if `y` lies on the keyboard.
    pub fn pitch_at(&self, y: f64) -> Option<u8> {
        let row = ((y - self.header_height) / self.row_height).floor();
        if row < 0.0 || row >= self.total_rows as f64 {
            return None;
        }
        let pitch = self.total_rows as f64 - 1.0 - row;
        (pitch <= self.max_pitch() as f64).then_some(pitch as u8)
    }

    /// Clamp a possibly out-of-range pitch onto the axis.
    pub fn clamp_pitch(&self, pitch: f64) -> u8 {
        pitch.round().clamp(0.0, self.max_pitch() as f64) as u8
    }

    /// Highest pitch that has a row (never above 127).
    pub fn max_pitch(&self) -> u8 {
        (self.total_rows.saturating_sub(1)).min(127) as u8
    }

    pub fn total_rows(&self) -> u32 {
        self.total_rows
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn header_height(&self) -> f64 {
        self.header_height
    }

    pub fn height(&self) -> f64 {
        self.row_height * self.total_rows as f64
    }

    pub fn is_black_key(pitch: u8) -> bool {
        matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
    }

    /// Octave label for C rows ("C3" for pitch 60 with the default range).
    pub fn key_label(&self, pitch: u8) -> Option<String> {
        (pitch % 12 == 0).then(|| self.note_name(pitch))
    }

    pub fn note_name(&self, pitch: u8) -> String {
        let octave = pitch as i32 / NOTES_IN_OCTAVE + self.start_octave;
        format!("{}{octave}", NAMES[(pitch % 12) as usize])
    }
}
