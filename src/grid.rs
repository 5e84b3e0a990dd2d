use std::ops::Range;

use crate::config::Layout;
use crate::error::ParseError;

/// Most measures the grid can hold.
pub const MAX_MEASURES: f64 = 1000.0;
/// Finest quantize denominator.
pub const MAX_DIVISION: u32 = 128;
/// Longest measure, in whole notes.
pub const MAX_MEASURE_LENGTH: f64 = 16.0;

/// Kind of a vertical grid line, as drawn by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// First line of the 1-based measure it starts.
    Bar(u32),
    /// Closing line after the last measure.
    End,
    /// Middle of a measure.
    Half,
    /// Any other quantize subdivision.
    Division,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub x: f64,
    pub kind: LineKind,
}

/// Horizontal (time) axis of the roll.
///
/// Owns the time signature, measure count, quantize division and default
/// note length, and converts between beats and pixels. Beats are counted in
/// units of the time signature's denominator, so one measure spans
/// `numerator` beats. Note lengths use the same unit.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    full_note_width: f64,
    origin_x: f64,
    numerator: f64,
    denominator: f64,
    measures: f64,
    measure_width: f64,
    grid_width: f64,
    quantize: String,
    /// Denominator of the quantize division; 0 when snapping is off.
    division: u32,
    value_width: Option<f64>,
    snap_increment: Option<f64>,
    /// Default note length as a fraction of a whole note.
    default_length: f64,
}

impl TimeGrid {
    /// 4/4, four measures, eighth-note quantize and eighth-note default length.
    pub fn new(layout: &Layout) -> Self {
        let mut grid = TimeGrid {
            full_note_width: layout.full_note_width,
            origin_x: layout.piano_width + layout.padding,
            numerator: 4.0,
            denominator: 4.0,
            measures: 4.0,
            measure_width: 0.0,
            grid_width: 0.0,
            quantize: String::new(),
            division: 0,
            value_width: None,
            snap_increment: None,
            default_length: 0.125,
        };
        grid.recompute_widths();
        grid.apply_quantize("1/8", 1, 8);
        grid
    }

    // -- setters --

    /// Accept "N/D". Both fields are reals; N must be positive and D non-zero.
    pub fn set_time_signature(&mut self, text: &str) -> Result<(), ParseError> {
        let fields = split_fields(text);
        let [n, d] = fields.as_slice() else {
            return Err(ParseError::FieldCount {
                input: text.to_string(),
                expected: "N/D",
            });
        };
        let numerator = parse_real(text, n)?;
        let denominator = parse_real(text, d)?;
        if denominator == 0.0 {
            return Err(ParseError::ZeroDenominator {
                input: text.to_string(),
            });
        }
        if numerator <= 0.0 || denominator < 0.0 {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "time signature fields must be positive",
            });
        }
        if numerator / denominator > MAX_MEASURE_LENGTH {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "a measure may span at most 16 whole notes",
            });
        }

        self.numerator = numerator;
        self.denominator = denominator;
        self.recompute_widths();
        Ok(())
    }

    /// Accept any positive real up to [`MAX_MEASURES`].
    pub fn set_measure_count(&mut self, text: &str) -> Result<(), ParseError> {
        let measures = parse_real(text, text.trim())?;
        if measures <= 0.0 {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "measure count must be positive",
            });
        }
        if measures > MAX_MEASURES {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "at most 1000 measures",
            });
        }
        self.measures = measures;
        self.recompute_widths();
        Ok(())
    }

    /// Accept "N" (1/N of a whole note, "0" turns snapping off) or "N/D"
    /// (N/D of a whole note). Both fields are non-negative integers.
    pub fn set_quantize_division(&mut self, text: &str) -> Result<(), ParseError> {
        let fields = split_fields(text);
        let (n, d) = match fields.as_slice() {
            [n] => {
                let n = parse_count(text, n)?;
                (if n == 0 { 0 } else { 1 }, n)
            }
            [n, d] => {
                let n = parse_count(text, n)?;
                let d = parse_count(text, d)?;
                if d == 0 {
                    return Err(ParseError::ZeroDenominator {
                        input: text.to_string(),
                    });
                }
                (n, d)
            }
            _ => {
                return Err(ParseError::FieldCount {
                    input: text.to_string(),
                    expected: "N or N/D",
                });
            }
        };
        if d > MAX_DIVISION {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "quantize denominator may be at most 128",
            });
        }
        self.apply_quantize(text.trim(), n, d);
        Ok(())
    }

    /// Accept "N" or "N/D" as a fraction of a whole note.
    pub fn set_default_length(&mut self, text: &str) -> Result<(), ParseError> {
        let fields = split_fields(text);
        let length = match fields.as_slice() {
            [n] => parse_real(text, n)?,
            [n, d] => {
                let n = parse_real(text, n)?;
                let d = parse_real(text, d)?;
                if d == 0.0 {
                    return Err(ParseError::ZeroDenominator {
                        input: text.to_string(),
                    });
                }
                n / d
            }
            _ => {
                return Err(ParseError::FieldCount {
                    input: text.to_string(),
                    expected: "N or N/D",
                });
            }
        };
        if length <= 0.0 {
            return Err(ParseError::OutOfRange {
                input: text.to_string(),
                reason: "note length must be positive",
            });
        }
        self.default_length = length;
        Ok(())
    }

    /// Derive the default length from the quantize division (one grid
    /// cell). Leaves it alone when snapping is off.
    pub fn reset_default_length(&mut self) {
        if self.division > 0 {
            self.default_length = 1.0 / self.division as f64;
        }
    }

    fn apply_quantize(&mut self, text: &str, n: u32, d: u32) {
        self.quantize = text.to_string();
        self.division = if n == 0 { 0 } else { d };
        self.value_width = (d > 0).then(|| self.full_note_width / d as f64);
        self.snap_increment =
            (n > 0 && d > 0).then(|| self.full_note_width * n as f64 / d as f64);
    }

    fn recompute_widths(&mut self) {
        self.measure_width = self.full_note_width * self.numerator / self.denominator;
        self.grid_width = self.measure_width * self.measures;
    }

    // -- conversions --

    /// Pixels per beat.
    pub fn beat_width(&self) -> f64 {
        self.grid_width / self.measures / self.numerator
    }

    pub fn beat_to_x(&self, beat: f64) -> f64 {
        self.origin_x + self.beat_width() * beat
    }

    pub fn x_to_beat(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.beat_width()
    }

    pub fn length_to_px(&self, length_beats: f64) -> f64 {
        self.beat_width() * length_beats
    }

    pub fn px_to_length(&self, width: f64) -> f64 {
        width / self.beat_width()
    }

    // -- accessors --

    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn numerator(&self) -> f64 {
        self.numerator
    }

    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    pub fn measures(&self) -> f64 {
        self.measures
    }

    pub fn measure_width(&self) -> f64 {
        self.measure_width
    }

    pub fn grid_width(&self) -> f64 {
        self.grid_width
    }

    /// Number of beats on the grid. Note starts must stay below this.
    pub fn grid_beats(&self) -> f64 {
        self.measures * self.numerator
    }

    pub fn snap_increment(&self) -> Option<f64> {
        self.snap_increment
    }

    /// Snap increment expressed in beats.
    pub fn snap_beats(&self) -> Option<f64> {
        self.snap_increment.map(|inc| inc / self.beat_width())
    }

    /// Spacing between drawn subdivision lines.
    pub fn value_width(&self) -> Option<f64> {
        self.value_width
    }

    pub fn default_length_beats(&self) -> f64 {
        self.default_length * self.denominator
    }

    pub fn default_length_px(&self) -> f64 {
        self.length_to_px(self.default_length_beats())
    }

    pub fn time_signature_text(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }

    pub fn measures_text(&self) -> String {
        self.measures.to_string()
    }

    pub fn quantize_text(&self) -> &str {
        &self.quantize
    }

    pub fn default_length_text(&self) -> String {
        format_fraction(self.default_length)
    }

    /// Vertical lines for the renderer that fall inside `range` (pixels):
    /// measure boundaries plus the quantize subdivisions inside each measure.
    pub fn grid_lines(&self, range: Range<f64>) -> Vec<GridLine> {
        let mut lines = Vec::new();
        let end_x = self.origin_x + self.grid_width;
        let visible = |x: f64| x >= range.start && x <= range.end;

        let whole = self.measures.floor() as u32;
        let first = ((range.start - self.origin_x) / self.measure_width)
            .floor()
            .max(0.0) as u32;
        let last = (((range.end - self.origin_x) / self.measure_width)
            .floor()
            .max(0.0) as u32)
            .min(whole);
        let per_measure = self.numerator * self.division as f64 / self.denominator;
        let value_width = self.value_width.filter(|_| self.division > 0);

        for i in first..=last {
            let bar_x = self.origin_x + self.measure_width * i as f64;
            if (i as f64) < self.measures && visible(bar_x) {
                lines.push(GridLine {
                    x: bar_x,
                    kind: LineKind::Bar(i + 1),
                });
            }
            let Some(value_width) = value_width else {
                continue;
            };
            let mut j = ((range.start - bar_x) / value_width).ceil().max(1.0);
            while j < per_measure {
                let x = bar_x + value_width * j;
                if x > end_x || x > range.end {
                    break;
                }
                let kind = if j == per_measure / 2.0 {
                    LineKind::Half
                } else {
                    LineKind::Division
                };
                lines.push(GridLine { x, kind });
                j += 1.0;
            }
        }
        if visible(end_x) {
            lines.push(GridLine {
                x: end_x,
                kind: LineKind::End,
            });
        }
        lines
    }

    /// Every grid line, left to right.
    pub fn all_grid_lines(&self) -> Vec<GridLine> {
        self.grid_lines(f64::NEG_INFINITY..f64::INFINITY)
    }
}

fn split_fields(text: &str) -> Vec<&str> {
    text.trim().split('/').map(str::trim).collect()
}

fn parse_real(input: &str, field: &str) -> Result<f64, ParseError> {
    let value: f64 = field.parse().map_err(|_| ParseError::NotANumber {
        input: input.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ParseError::OutOfRange {
            input: input.to_string(),
            reason: "value must be finite",
        });
    }
    Ok(value)
}

fn parse_count(input: &str, field: &str) -> Result<u32, ParseError> {
    field.parse().map_err(|_| ParseError::NotANumber {
        input: input.to_string(),
    })
}

/// Render a whole-note fraction the way it is typed in: "1/8", "1", "3/16".
fn format_fraction(value: f64) -> String {
    if value.fract() == 0.0 {
        return value.to_string();
    }
    for d in 1..=64u32 {
        let n = value * d as f64;
        if (n - n.round()).abs() < 1e-9 {
            return format!("{}/{}", n.round(), d);
        }
    }
    value.to_string()
}
