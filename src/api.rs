//! # Public API
//!
//! Entry points that chain extraction, validation, encoding and synthesis.
//!
//! ## Conversion Functions
//!
//! - [`encode_document()`] - MusicXML text to piano-roll windows
//! - [`regenerate()`] - MusicXML text to a clean single-part score, validated first
//! - [`regenerate_unchecked()`] - Same, without validation
//! - [`summarize()`] - Metadata summary of an extracted piece
//!
//! ## Batches
//!
//! [`BatchDriver`] feeds documents one at a time through the encoder and
//! keeps a [`BatchReport`]. With [`FailurePolicy::Abort`] the first failing
//! document stops the batch; with [`FailurePolicy::Skip`] it is recorded and
//! the batch continues.
//!
//! ```rust
//! use melodyroll::{BatchDriver, EncoderConfig, FailurePolicy};
//!
//! let mut driver = BatchDriver::new(EncoderConfig::default(), FailurePolicy::Skip);
//! let output = driver.process("broken", "<score-partwise>")?;
//! assert!(output.is_none());
//! assert_eq!(driver.report().failed.len(), 1);
//! # Ok::<(), melodyroll::ConvertError>(())
//! ```

use crate::error::Result;
use crate::extract::extract;
use crate::model::{Extraction, OctaveConvention};
use crate::musicxml::{synthesize, SynthConfig};
use crate::segment::{encode, EncoderConfig, Window};
use crate::summary::PieceSummary;
use crate::validate::validate;
use tracing::{debug, info, warn};

/// Extract a document and encode its melody into windows.
///
/// # Example
/// ```rust
/// use melodyroll::{encode_document, EncoderConfig};
///
/// let measure = r#"<measure><note><pitch><step>C</step><octave>4</octave></pitch><duration>16</duration></note></measure>"#;
/// let xml = format!(
///     "<score-partwise><part id=\"P1\">{}</part></score-partwise>",
///     measure.repeat(5)
/// );
/// let windows = encode_document(&xml, &EncoderConfig::default())?;
/// assert_eq!(windows.len(), 2);
/// # Ok::<(), melodyroll::ConvertError>(())
/// ```
pub fn encode_document(xml: &str, config: &EncoderConfig) -> Result<Vec<Window>> {
    let extraction = extract(xml)?;
    encode(&extraction.melody, &extraction.meta, config)
}

/// Re-emit a document as a clean single-part score.
///
/// # Pipeline
/// 1. Extract metadata, melody and chords
/// 2. Validate the melody against the measure grid
/// 3. Synthesize and serialize
///
/// # Errors
/// Returns [`ConvertError::SemanticError`](crate::ConvertError::SemanticError) if the melody does not fill its
/// measures, and any extraction or synthesis error.
pub fn regenerate(xml: &str, config: &SynthConfig) -> Result<String> {
    let extraction = extract(xml)?;
    validate(&extraction.meta, &extraction.melody)?;
    write_score(&extraction, config)
}

/// Re-emit a document without validating it first.
pub fn regenerate_unchecked(xml: &str, config: &SynthConfig) -> Result<String> {
    let extraction = extract(xml)?;
    write_score(&extraction, config)
}

fn write_score(extraction: &Extraction, config: &SynthConfig) -> Result<String> {
    synthesize(&extraction.meta, &extraction.melody, &extraction.chords, config)?.to_document_string()
}

/// Summarize an extracted piece.
pub fn summarize(name: &str, extraction: &Extraction, convention: OctaveConvention) -> PieceSummary {
    PieceSummary::new(name, &extraction.meta, &extraction.melody, convention)
}

/// What to do when a document in a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the batch at the first failure.
    #[default]
    Abort,
    /// Record the failure and move on.
    Skip,
}

/// Windows and summary produced for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutput {
    pub name: String,
    pub windows: Vec<Window>,
    pub summary: PieceSummary,
}

/// Running totals of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Documents encoded.
    pub converted: usize,
    /// Documents passed over because their divisions do not fit the grid.
    pub skipped: Vec<String>,
    /// Documents that failed, with the error message.
    pub failed: Vec<(String, String)>,
    /// Windows produced across all documents.
    pub windows: usize,
    /// One entry per document that could be read.
    pub summaries: Vec<PieceSummary>,
}

/// Runs documents through extraction and encoding one at a time.
///
/// Each document gets a fresh extraction, so a failure never leaks state
/// into the next one.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    config: EncoderConfig,
    policy: FailurePolicy,
    look_only: bool,
    report: BatchReport,
}

impl BatchDriver {
    pub fn new(config: EncoderConfig, policy: FailurePolicy) -> Self {
        Self {
            config,
            policy,
            look_only: false,
            report: BatchReport::default(),
        }
    }

    /// Only collect summaries; nothing is encoded.
    pub fn look_only(mut self, look_only: bool) -> Self {
        self.look_only = look_only;
        self
    }

    /// Process one document.
    ///
    /// Returns `Ok(None)` when the document was skipped, looked at only, or
    /// failed under [`FailurePolicy::Skip`].
    pub fn process(&mut self, name: &str, xml: &str) -> Result<Option<DocumentOutput>> {
        match self.convert(name, xml) {
            Ok(output) => Ok(output),
            Err(e) => match self.policy {
                FailurePolicy::Abort => Err(e),
                FailurePolicy::Skip => {
                    warn!(document = name, error = %e, "conversion failed, skipping");
                    self.report.failed.push((name.to_string(), e.to_string()));
                    Ok(None)
                }
            },
        }
    }

    fn convert(&mut self, name: &str, xml: &str) -> Result<Option<DocumentOutput>> {
        let extraction = extract(xml)?;
        let summary = summarize(name, &extraction, self.config.octave_convention);
        self.report.summaries.push(summary.clone());

        if self.look_only {
            debug!(document = name, "summary collected");
            return Ok(None);
        }
        if !self.config.accepts_divisions(extraction.meta.divisions) {
            info!(
                document = name,
                divisions = extraction.meta.divisions,
                grid_resolution = self.config.grid_resolution,
                "divisions do not divide the grid resolution, skipping"
            );
            self.report.skipped.push(name.to_string());
            return Ok(None);
        }

        let windows = encode(&extraction.melody, &extraction.meta, &self.config)?;
        info!(document = name, windows = windows.len(), "encoded");
        self.report.converted += 1;
        self.report.windows += windows.len();
        Ok(Some(DocumentOutput {
            name: name.to_string(),
            windows,
            summary,
        }))
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    pub fn finish(self) -> BatchReport {
        self.report
    }
}
