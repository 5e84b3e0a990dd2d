use thiserror::Error;

/// Rejected configuration text. The setter that produced it leaves every
/// previously accepted value (and everything derived from it) untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{input}': expected {expected}")]
    FieldCount {
        input: String,
        expected: &'static str,
    },
    #[error("'{input}' is not a number")]
    NotANumber { input: String },
    #[error("'{input}' has a zero denominator")]
    ZeroDenominator { input: String },
    #[error("'{input}' is out of range ({reason})")]
    OutOfRange {
        input: String,
        reason: &'static str,
    },
}

impl ParseError {
    /// The text that was rejected.
    pub fn input(&self) -> &str {
        match self {
            ParseError::FieldCount { input, .. }
            | ParseError::NotANumber { input }
            | ParseError::ZeroDenominator { input }
            | ParseError::OutOfRange { input, .. } => input,
        }
    }
}
