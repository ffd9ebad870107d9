//! # Error Types
//!
//! This module defines all error types for melodyroll conversions.
//!
//! Every error is fatal to the document being converted: nothing is
//! produced for that input. Errors carry the measure, tick or pitch that
//! triggered them so a batch driver can report the problem and move on.
//!
//! ## Error Kinds
//! - `MalformedStructure` - a mandatory element is missing or unreadable
//! - `PitchRange` - an encoded note falls outside the configured pitch extent
//! - `TimingConsistency` - melody timing disagrees with the measure grid
//! - `UnsupportedTuplet` - a note value that cannot be notated
//! - `Configuration` - invalid settings or piece metadata
//!
//! ## Usage
//! ```rust
//! use melodyroll::{extract, ConvertError, ErrorKind};
//!
//! match extract("<score-partwise><part id=\"P1\"/></score-partwise>") {
//!     Ok(extraction) => println!("{} notes", extraction.melody.len()),
//!     Err(e) if e.kind() == ErrorKind::MalformedStructure => eprintln!("skipping: {}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Broad classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedStructure,
    PitchRange,
    TimingConsistency,
    UnsupportedTuplet,
    Configuration,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// A mandatory element is absent or carries an unreadable value.
    ///
    /// # Example
    /// ```
    /// # use melodyroll::ConvertError;
    /// let err = ConvertError::Malformed {
    ///     measure: 3,
    ///     message: "harmony without root-step".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Malformed score at measure 3: harmony without root-step");
    /// ```
    #[error("Malformed score at measure {measure}: {message}")]
    Malformed { measure: u32, message: String },

    /// A pitched note lies outside `[low, high)`.
    #[error("Pitch {pitch} at tick {tick} is outside the encodable range [{low}, {high})")]
    PitchOutOfRange {
        pitch: i32,
        tick: u32,
        low: i32,
        high: i32,
    },

    /// The note expected to open a window does not exist.
    #[error("Expected a note starting at tick {tick}")]
    NoteNotFound { tick: u32 },

    /// The synthesizer's clock and the next melody note disagree.
    ///
    /// `found` is `None` when the melody ran out before the measure was filled.
    #[error("Timing mismatch at measure {measure}: clock is at tick {expected}, next note starts at {}", display_tick(.found))]
    ClockMismatch {
        measure: u32,
        expected: u32,
        found: Option<u32>,
    },

    /// A tuplet whose ratio is neither a quarter- nor an eighth-note triplet.
    #[error("Unsupported tuplet: duration {duration} on divisions {divisions}")]
    UnsupportedTuplet { duration: u32, divisions: u32 },

    /// A duration outside the 64th-note to breve range.
    #[error("Cannot notate duration {duration} on divisions {divisions}")]
    UnclassifiableDuration { duration: u32, divisions: u32 },

    /// Invalid piece metadata, such as a map entry beyond the last measure.
    ///
    /// # Example
    /// ```
    /// # use melodyroll::ConvertError;
    /// let err = ConvertError::MetadataError("time entry at measure 9 exceeds 8 measures".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: time entry at measure 9 exceeds 8 measures");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// The melody does not fill the measure grid.
    #[error("Semantic error at measure {measure}: {message}")]
    SemanticError { measure: u32, message: String },

    /// The grid resolution is not a multiple of the piece's divisions.
    #[error("Grid resolution {grid_resolution} is not a multiple of divisions {divisions}")]
    IncompatibleDivisions { grid_resolution: u32, divisions: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A summary table could not be written.
    #[error("Summary export failed: {0}")]
    Export(String),
}

fn display_tick(tick: &Option<u32>) -> String {
    match tick {
        Some(t) => t.to_string(),
        None => "<end of melody>".to_string(),
    }
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Xml(_) | ConvertError::Malformed { .. } => ErrorKind::MalformedStructure,
            ConvertError::PitchOutOfRange { .. } => ErrorKind::PitchRange,
            ConvertError::NoteNotFound { .. }
            | ConvertError::ClockMismatch { .. }
            | ConvertError::SemanticError { .. } => ErrorKind::TimingConsistency,
            ConvertError::UnsupportedTuplet { .. } | ConvertError::UnclassifiableDuration { .. } => {
                ErrorKind::UnsupportedTuplet
            }
            ConvertError::MetadataError(_)
            | ConvertError::IncompatibleDivisions { .. }
            | ConvertError::Config(_)
            | ConvertError::Export(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
