use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::note::Note;
use crate::pitch::MAX_OCTAVES;

/// Editor configuration file.
///
/// ```toml
/// note = [[72, 0, 0.25, 20], [73, 1, 0.25, 20]]
///
/// [grid]
/// time_signature = "6/4"
/// measures = 5
/// quantize = "1/8"
///
/// [layout]
/// row_height = 10
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridSettings,
    pub layout: Layout,
    /// Notes placed when the editor starts.
    #[serde(rename = "note")]
    pub notes: Vec<Note>,
}

/// Grid settings as typed into the toolbar. Fed through the validated
/// setters, so a bad value is reported and the built-in default kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    #[serde(deserialize_with = "text_or_number")]
    pub time_signature: String,
    #[serde(deserialize_with = "text_or_number")]
    pub measures: String,
    #[serde(deserialize_with = "text_or_number")]
    pub quantize: String,
    /// Fraction of a whole note. Defaults to one quantize cell.
    #[serde(deserialize_with = "opt_text_or_number")]
    pub default_length: Option<String>,
    /// Velocity given to notes placed in insert mode.
    pub velocity: u8,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings {
            time_signature: "4/4".into(),
            measures: "4".into(),
            quantize: "1/8".into(),
            default_length: None,
            velocity: 100,
        }
    }
}

/// Fixed pixel dimensions of the roll.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Width of one whole note.
    pub full_note_width: f64,
    pub row_height: f64,
    pub header_height: f64,
    pub piano_width: f64,
    pub padding: f64,
    pub start_octave: i32,
    pub end_octave: i32,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            full_note_width: 250.0,
            row_height: 10.0,
            header_height: 20.0,
            piano_width: 32.0,
            padding: 2.0,
            start_octave: -2,
            end_octave: 8,
        }
    }
}

impl Layout {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("full_note_width", self.full_note_width),
            ("row_height", self.row_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("layout.{name} must be positive (got {value})");
            }
        }
        for (name, value) in [
            ("header_height", self.header_height),
            ("piano_width", self.piano_width),
            ("padding", self.padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("layout.{name} must not be negative (got {value})");
            }
        }
        if self.end_octave <= self.start_octave {
            anyhow::bail!(
                "layout.end_octave ({}) must be above layout.start_octave ({})",
                self.end_octave,
                self.start_octave
            );
        }
        let octaves = self.end_octave as i64 - self.start_octave as i64;
        if octaves > MAX_OCTAVES {
            anyhow::bail!(
                "layout spans {octaves} octaves ({}..{}), at most {MAX_OCTAVES} are supported",
                self.start_octave,
                self.end_octave
            );
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> anyhow::Result<EditorConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> anyhow::Result<EditorConfig> {
    let config: EditorConfig = toml::from_str(content)?;
    config.layout.validate()?;
    Ok(config)
}

/// Accept `measures = 4` as well as `measures = "4"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<TextOrNumber> for String {
    fn from(v: TextOrNumber) -> Self {
        match v {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Int(i) => i.to_string(),
            TextOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    TextOrNumber::deserialize(d).map(String::from)
}

fn opt_text_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<TextOrNumber>::deserialize(d).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.grid.time_signature, "4/4");
        assert_eq!(config.grid.measures, "4");
        assert_eq!(config.grid.default_length, None);
        assert_eq!(config.layout.full_note_width, 250.0);
        assert!(config.notes.is_empty());
    }

    #[test]
    fn numbers_or_strings() {
        let config = parse(
            r#"
            [grid]
            time_signature = "6/4"
            measures = 5
            default_length = 0.5
            velocity = 90

            [layout]
            piano_width = 34
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.time_signature, "6/4");
        assert_eq!(config.grid.measures, "5");
        assert_eq!(config.grid.default_length.as_deref(), Some("0.5"));
        assert_eq!(config.grid.velocity, 90);
        assert_eq!(config.layout.piano_width, 34.0);
        assert_eq!(config.layout.row_height, 10.0);
    }

    #[test]
    fn seed_notes() {
        let config = parse("note = [[72, 0, 0.25, 20], [73, 1, 0.25, 20]]").unwrap();
        assert_eq!(config.notes.len(), 2);
        assert_eq!(config.notes[1].to_tuple(), (73, 1.0, 0.25, 20));
    }

    #[test]
    fn invalid_layout_rejected() {
        assert!(parse("[layout]\nrow_height = 0").is_err());
        assert!(parse("[layout]\nstart_octave = 3\nend_octave = 3").is_err());
        assert!(parse("[layout]\nend_octave = 400000000").is_err());
        assert!(parse("[layout]\nstart_octave = -2147483648\nend_octave = 2147483647").is_err());
        assert!(parse("[layout]\nstart_octave = 0\nend_octave = 10").is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[grid]\nquantize = \"1/16\"").unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.grid.quantize, "1/16");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.toml")).is_err());
    }
}
