//! # Melody Validation
//!
//! Checks that a melody can be written back into its measure grid.
//!
//! ## Rules
//! - Notes are in start order and contiguous from tick 0 (no gaps, no overlaps)
//! - No note has zero duration
//! - No note crosses a barline
//! - Every measure is filled exactly; a pickup measure lasts `upbeat_length`
//! - No note lies past the final measure
//!
//! Synthesis fails on the first violation anyway; validating first reports
//! the problem by measure with a readable message.
//!
//! ## Example
//! ```rust
//! use melodyroll::{validate, NoteEvent, PieceMeta, Step};
//!
//! let meta = PieceMeta::new();
//! let melody = vec![NoteEvent::pitched(Step::C, 0, 4, 16, 0)];
//! validate(&meta, &melody)?;
//! # Ok::<(), melodyroll::ConvertError>(())
//! ```

use crate::error::{ConvertError, Result};
use crate::model::{NoteEvent, PieceMeta};

/// Validate a melody against the measure grid of `meta`.
pub fn validate(meta: &PieceMeta, melody: &[NoteEvent]) -> Result<()> {
    let mut notes = melody.iter().peekable();
    let mut clock: u32 = 0;

    for measure in 1..=meta.measure_count() {
        let end = clock + meta.measure_length(measure);

        while let Some(note) = notes.next_if(|n| n.start_time < end) {
            if note.duration == 0 {
                return Err(semantic(measure, format!("note at tick {} has no duration", note.start_time)));
            }
            if note.start_time != clock {
                let problem = if note.start_time > clock { "gap" } else { "overlap" };
                return Err(semantic(
                    measure,
                    format!(
                        "{} before the note at tick {}: previous note ends at tick {}",
                        problem, note.start_time, clock
                    ),
                ));
            }
            if note.end_time() > end {
                return Err(semantic(
                    measure,
                    format!(
                        "note at tick {} lasts {} ticks and crosses the barline at tick {}",
                        note.start_time, note.duration, end
                    ),
                ));
            }
            clock = note.end_time();
        }

        if clock != end {
            return Err(semantic(
                measure,
                format!(
                    "measure is filled to tick {} but lasts until tick {}",
                    clock, end
                ),
            ));
        }
    }

    let extra = notes.count();
    if extra > 0 {
        return Err(semantic(
            meta.measure_count(),
            format!("{} notes start after the final measure", extra),
        ));
    }
    Ok(())
}

fn semantic(measure: u32, message: String) -> ConvertError {
    ConvertError::SemanticError { measure, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Step, TimeSignature};

    fn quarters(count: u32) -> Vec<NoteEvent> {
        (0..count).map(|i| NoteEvent::pitched(Step::A, 0, 4, 4, i * 4)).collect()
    }

    fn meta(measures: u32) -> PieceMeta {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(measures).unwrap();
        meta
    }

    fn failing_measure(result: Result<()>) -> u32 {
        match result {
            Err(ConvertError::SemanticError { measure, .. }) => measure,
            other => panic!("expected semantic error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_melody() {
        assert!(validate(&meta(3), &quarters(12)).is_ok());
    }

    #[test]
    fn test_valid_with_time_change_and_pickup() {
        let mut meta = meta(3);
        meta.upbeat_length = 4;
        meta.set_time(3, TimeSignature::new(3, 4)).unwrap();
        // pickup 4 + 4/4 16 + 3/4 12
        assert!(validate(&meta, &quarters(8)).is_ok());
    }

    #[test]
    fn test_gap_is_reported() {
        let mut melody = quarters(8);
        melody.remove(5);
        let err = validate(&meta(2), &melody).unwrap_err();
        assert!(err.to_string().contains("gap before the note at tick 24"));
        assert_eq!(failing_measure(Err(err)), 2);
    }

    #[test]
    fn test_overlap_is_reported() {
        let mut melody = quarters(4);
        melody[1].duration = 8;
        assert_eq!(failing_measure(validate(&meta(1), &melody)), 1);
    }

    #[test]
    fn test_barline_crossing() {
        let mut melody = quarters(7);
        melody[3].duration = 8;
        melody.truncate(4);
        melody.extend((0..3).map(|i| NoteEvent::pitched(Step::B, 0, 4, 4, 20 + i * 4)));
        let err = validate(&meta(2), &melody).unwrap_err();
        assert!(err.to_string().contains("crosses the barline at tick 16"));
    }

    #[test]
    fn test_short_measure() {
        assert_eq!(failing_measure(validate(&meta(2), &quarters(6))), 2);
    }

    #[test]
    fn test_notes_past_the_end() {
        let err = validate(&meta(1), &quarters(6)).unwrap_err();
        assert!(err.to_string().contains("2 notes start after the final measure"));
    }

    #[test]
    fn test_zero_duration() {
        let mut melody = quarters(4);
        melody.insert(1, NoteEvent::rest(0, 4));
        assert_eq!(failing_measure(validate(&meta(1), &melody)), 1);
    }
}
