//! # Symbolic Music Model
//!
//! Value types shared by the extractor, the segmenter and the synthesizer.
//!
//! ## Type Hierarchy
//! ```text
//! Extraction
//!   ├── PieceMeta
//!   │     ├── measure_count, first_number, divisions, upbeat_length
//!   │     ├── tempo_map: measure -> TempoMark (bpm, beat unit, sounding bpm)
//!   │     ├── key_map:   measure -> fifths
//!   │     └── time_map:  measure -> TimeSignature
//!   ├── Vec<NoteEvent>   (start-ordered, one voice)
//!   └── BTreeMap<tick, ChordEvent>
//! ```
//!
//! ## Time
//! All positions and lengths are integer ticks; `divisions` ticks make one
//! quarter note. A measure of `beats/beat_type` lasts
//! `divisions * 4 * beats / beat_type` ticks.
//!
//! ## Sparse Maps
//! Tempo, key and time entries take effect at their measure and hold until
//! the next entry. Measure 1 always has an entry, so a lookup never misses.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ticks per quarter note when a score never states its divisions.
pub const DEFAULT_DIVISIONS: u32 = 4;

/// Note step, with `R` standing for a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
    R,
}

impl Step {
    /// Parse a MusicXML `<step>` value.
    pub fn from_letter(s: &str) -> Option<Self> {
        match s.trim() {
            "C" => Some(Step::C),
            "D" => Some(Step::D),
            "E" => Some(Step::E),
            "F" => Some(Step::F),
            "G" => Some(Step::G),
            "A" => Some(Step::A),
            "B" => Some(Step::B),
            _ => None,
        }
    }

    /// Semitones above C. Rests have no pitch class.
    pub fn pitch_class(self) -> Option<i32> {
        match self {
            Step::C => Some(0),
            Step::D => Some(2),
            Step::E => Some(4),
            Step::F => Some(5),
            Step::G => Some(7),
            Step::A => Some(9),
            Step::B => Some(11),
            Step::R => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
            Step::R => "R",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Octave numbering used when turning a step and octave into a MIDI number.
///
/// - `International`: C4 = 60
/// - `Yamaha`: C3 = 60
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OctaveConvention {
    #[default]
    International,
    Yamaha,
}

impl OctaveConvention {
    fn octave_offset(self) -> i32 {
        match self {
            OctaveConvention::International => 1,
            OctaveConvention::Yamaha => 2,
        }
    }
}

/// Visual note value, as written in a MusicXML `<type>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteType {
    SixtyFourth,
    ThirtySecond,
    Sixteenth,
    Eighth,
    Quarter,
    Half,
    Whole,
    Breve,
}

impl NoteType {
    /// MusicXML type name
    pub fn musicxml_type(&self) -> &'static str {
        match self {
            NoteType::SixtyFourth => "64th",
            NoteType::ThirtySecond => "32nd",
            NoteType::Sixteenth => "16th",
            NoteType::Eighth => "eighth",
            NoteType::Quarter => "quarter",
            NoteType::Half => "half",
            NoteType::Whole => "whole",
            NoteType::Breve => "breve",
        }
    }
}

// Lower bounds of each note value as a fraction of a quarter note,
// longest first. Each range is half-open up to the previous bound.
const NOTE_TYPE_TABLE: [(u32, u32, NoteType); 8] = [
    (8, 1, NoteType::Breve),
    (4, 1, NoteType::Whole),
    (2, 1, NoteType::Half),
    (1, 1, NoteType::Quarter),
    (1, 2, NoteType::Eighth),
    (1, 4, NoteType::Sixteenth),
    (1, 8, NoteType::ThirtySecond),
    (1, 16, NoteType::SixtyFourth),
];

/// A single melody note or rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub step: Step,
    pub alter: i32,
    pub octave: i32,
    pub duration: u32,
    pub start_time: u32,
    pub is_tuplet: bool,
}

impl NoteEvent {
    pub fn pitched(step: Step, alter: i32, octave: i32, duration: u32, start_time: u32) -> Self {
        Self {
            step,
            alter,
            octave,
            duration,
            start_time,
            is_tuplet: false,
        }
    }

    pub fn rest(duration: u32, start_time: u32) -> Self {
        Self {
            step: Step::R,
            alter: 0,
            octave: 0,
            duration,
            start_time,
            is_tuplet: false,
        }
    }

    pub fn with_tuplet(mut self) -> Self {
        self.is_tuplet = true;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.step == Step::R
    }

    /// Tick just past the end of this note, saturating at `u32::MAX`.
    pub fn end_time(&self) -> u32 {
        self.start_time.saturating_add(self.duration)
    }

    /// MIDI note number, or `None` for a rest.
    ///
    /// ```
    /// use melodyroll::{NoteEvent, OctaveConvention, Step};
    ///
    /// let c5 = NoteEvent::pitched(Step::C, 0, 5, 24, 0);
    /// assert_eq!(c5.midi_pitch(OctaveConvention::International), Some(72));
    /// assert_eq!(c5.midi_pitch(OctaveConvention::Yamaha), Some(84));
    /// ```
    pub fn midi_pitch(&self, convention: OctaveConvention) -> Option<i32> {
        let pc = self.step.pitch_class()?;
        Some(12 * (self.octave + convention.octave_offset()) + pc + self.alter)
    }

    /// Classify the written note value for the given divisions.
    ///
    /// Tuplets only support the quarter-note triplet (ratio 1.5) and the
    /// eighth-note triplet (ratio 3.0).
    pub fn note_type(&self, divisions: u32) -> Result<NoteType> {
        let d = u64::from(self.duration);
        let v = u64::from(divisions);

        if self.is_tuplet {
            // divisions / duration == 3/2
            if 2 * v == 3 * d {
                return Ok(NoteType::Quarter);
            }
            // divisions / duration == 3
            if v == 3 * d {
                return Ok(NoteType::Eighth);
            }
            return Err(ConvertError::UnsupportedTuplet {
                duration: self.duration,
                divisions,
            });
        }

        // ratio = d / v must be below 16 quarters
        if d == 0 || v == 0 || d >= 16 * v {
            return Err(ConvertError::UnclassifiableDuration {
                duration: self.duration,
                divisions,
            });
        }
        NOTE_TYPE_TABLE
            .iter()
            .find(|(num, den, _)| d * u64::from(*den) >= v * u64::from(*num))
            .map(|(_, _, ty)| *ty)
            .ok_or(ConvertError::UnclassifiableDuration {
                duration: self.duration,
                divisions,
            })
    }
}

/// Accidental glyph for an alteration in semitones.
pub fn accidental_symbol(alter: i32) -> &'static str {
    match alter {
        -2 => "♭♭",
        -1 => "♭",
        1 => "♯",
        2 => "♯♯",
        _ => "",
    }
}

/// A chord symbol from a `<harmony>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordEvent {
    pub root_step: String,
    pub root_alter: i32,
    pub kind: String,
    pub kind_text: String,
    /// Added scale degree, 0 when the chord has no tension.
    pub tension_degree: i32,
    pub tension_alter: i32,
    pub tension_type: String,
    /// Bass step of a slash chord, empty otherwise.
    pub bass_step: String,
    pub bass_alter: i32,
}

impl ChordEvent {
    pub fn new(root_step: &str, root_alter: i32, kind: &str, kind_text: &str) -> Self {
        Self {
            root_step: root_step.to_string(),
            root_alter,
            kind: kind.to_string(),
            kind_text: kind_text.to_string(),
            tension_degree: 0,
            tension_alter: 0,
            tension_type: String::new(),
            bass_step: String::new(),
            bass_alter: 0,
        }
    }

    pub fn set_tension(&mut self, degree: i32, alter: i32, tension_type: &str) {
        self.tension_degree = degree;
        self.tension_alter = alter;
        self.tension_type = tension_type.to_string();
    }

    pub fn set_bass(&mut self, step: &str, alter: i32) {
        self.bass_step = step.to_string();
        self.bass_alter = alter;
    }

    pub fn has_tension(&self) -> bool {
        self.tension_degree != 0
    }

    pub fn is_slash_chord(&self) -> bool {
        !self.bass_step.is_empty()
    }

    /// Render the chord as a lead-sheet symbol.
    ///
    /// Only the "add" reading of a tension is rendered.
    ///
    /// ```
    /// use melodyroll::ChordEvent;
    ///
    /// let mut chord = ChordEvent::new("B", -1, "major-seventh", "M7");
    /// chord.set_tension(9, 1, "add");
    /// chord.set_bass("D", 0);
    /// assert_eq!(chord.symbol(), "B♭M7(♯9)/D");
    /// ```
    pub fn symbol(&self) -> String {
        let mut symbol = format!(
            "{}{}{}",
            self.root_step,
            accidental_symbol(self.root_alter),
            self.kind_text
        );
        if self.has_tension() {
            symbol.push_str(&format!(
                "({}{})",
                accidental_symbol(self.tension_alter),
                self.tension_degree
            ));
        }
        if self.is_slash_chord() {
            symbol.push('/');
            symbol.push_str(&self.bass_step);
            symbol.push_str(accidental_symbol(self.bass_alter));
        }
        symbol
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        beats: 4,
        beat_type: 4,
    };

    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type }
    }

    pub fn is_common_time(&self) -> bool {
        *self == Self::COMMON
    }

    /// Measure length in ticks.
    pub fn measure_ticks(&self, divisions: u32) -> u32 {
        if self.beat_type == 0 {
            return 0;
        }
        let ticks = u64::from(divisions) * 4 * u64::from(self.beats) / u64::from(self.beat_type);
        ticks as u32
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Tempo marking: the printed metronome mark plus the playback rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TempoMark {
    pub bpm: u32,
    pub beat_unit: String,
    pub sound_bpm: u32,
}

impl TempoMark {
    pub fn new(bpm: u32, beat_unit: &str, sound_bpm: u32) -> Self {
        Self {
            bpm,
            beat_unit: beat_unit.to_string(),
            sound_bpm,
        }
    }
}

impl Default for TempoMark {
    fn default() -> Self {
        Self::new(120, "quarter", 120)
    }
}

/// A contiguous run of measures sharing one time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRegion {
    pub start_measure: u32,
    pub measure_count: u32,
    pub signature: TimeSignature,
}

/// Piece-level information: measure count, divisions and the sparse
/// tempo/key/time maps.
///
/// Map setters reject measure numbers beyond `measure_count`; grow the
/// piece with [`PieceMeta::set_measure_count`] first.
///
/// Maps and setters count measures from 1 in document order. The printed
/// numbers start at `first_number` instead, which is 0 for a pickup
/// numbered `0`; see [`PieceMeta::measure_number`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceMeta {
    measure_count: u32,
    tempo_map: BTreeMap<u32, TempoMark>,
    key_map: BTreeMap<u32, i32>,
    time_map: BTreeMap<u32, TimeSignature>,
    pub divisions: u32,
    pub upbeat_length: u32,
    /// Printed number of the first measure.
    pub first_number: u32,
}

impl Default for PieceMeta {
    fn default() -> Self {
        Self {
            measure_count: 1,
            tempo_map: BTreeMap::from([(1, TempoMark::default())]),
            key_map: BTreeMap::from([(1, 0)]),
            time_map: BTreeMap::from([(1, TimeSignature::COMMON)]),
            divisions: DEFAULT_DIVISIONS,
            upbeat_length: 0,
            first_number: 1,
        }
    }
}

impl PieceMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure_count(&self) -> u32 {
        self.measure_count
    }

    /// Printed number of the measure at 1-based position `position`.
    pub fn measure_number(&self, position: u32) -> u32 {
        self.first_number.saturating_add(position.saturating_sub(1))
    }

    /// Printed number of the last measure.
    pub fn last_measure_number(&self) -> u32 {
        self.measure_number(self.measure_count)
    }

    pub fn tempo_map(&self) -> &BTreeMap<u32, TempoMark> {
        &self.tempo_map
    }

    pub fn key_map(&self) -> &BTreeMap<u32, i32> {
        &self.key_map
    }

    pub fn time_map(&self) -> &BTreeMap<u32, TimeSignature> {
        &self.time_map
    }

    /// Set the number of measures. Shrinking below an existing map entry is rejected.
    pub fn set_measure_count(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(ConvertError::MetadataError(
                "a piece needs at least one measure".to_string(),
            ));
        }
        let last_key = [
            self.tempo_map.keys().next_back(),
            self.key_map.keys().next_back(),
            self.time_map.keys().next_back(),
        ]
        .into_iter()
        .flatten()
        .max()
        .copied()
        .unwrap_or(1);
        if count < last_key {
            return Err(ConvertError::MetadataError(format!(
                "cannot shrink to {} measures: an entry exists at measure {}",
                count, last_key
            )));
        }
        self.measure_count = count;
        Ok(())
    }

    fn check_measure(&self, what: &str, measure: u32) -> Result<()> {
        if measure == 0 || measure > self.measure_count {
            return Err(ConvertError::MetadataError(format!(
                "{} entry at measure {} is outside 1..={}",
                what, measure, self.measure_count
            )));
        }
        Ok(())
    }

    pub fn set_tempo(&mut self, measure: u32, tempo: TempoMark) -> Result<()> {
        self.check_measure("tempo", measure)?;
        self.tempo_map.insert(measure, tempo);
        Ok(())
    }

    pub fn set_key(&mut self, measure: u32, fifths: i32) -> Result<()> {
        self.check_measure("key", measure)?;
        self.key_map.insert(measure, fifths);
        Ok(())
    }

    pub fn set_time(&mut self, measure: u32, signature: TimeSignature) -> Result<()> {
        self.check_measure("time", measure)?;
        if signature.beats == 0 || signature.beat_type == 0 {
            return Err(ConvertError::MetadataError(format!(
                "time signature {} at measure {} is degenerate",
                signature, measure
            )));
        }
        self.time_map.insert(measure, signature);
        Ok(())
    }

    pub fn set_divisions(&mut self, divisions: u32) -> Result<()> {
        if divisions == 0 {
            return Err(ConvertError::MetadataError(
                "divisions must be positive".to_string(),
            ));
        }
        self.divisions = divisions;
        Ok(())
    }

    /// Entry in effect at `measure` (the latest entry at or before it).
    fn effective<T>(map: &BTreeMap<u32, T>, measure: u32) -> Option<&T> {
        map.range(..=measure).next_back().map(|(_, v)| v)
    }

    pub fn time_at(&self, measure: u32) -> TimeSignature {
        Self::effective(&self.time_map, measure)
            .copied()
            .unwrap_or_default()
    }

    pub fn key_at(&self, measure: u32) -> i32 {
        Self::effective(&self.key_map, measure).copied().unwrap_or(0)
    }

    pub fn tempo_at(&self, measure: u32) -> TempoMark {
        Self::effective(&self.tempo_map, measure)
            .cloned()
            .unwrap_or_default()
    }

    /// Length in ticks of one measure under `signature` at this piece's divisions.
    pub fn measure_ticks(&self, signature: TimeSignature) -> u32 {
        signature.measure_ticks(self.divisions)
    }

    /// Length in ticks of a specific measure; a pickup measure lasts `upbeat_length`.
    pub fn measure_length(&self, measure: u32) -> u32 {
        if measure == 1 && self.upbeat_length > 0 {
            self.upbeat_length
        } else {
            self.measure_ticks(self.time_at(measure))
        }
    }

    /// Total length of the piece in ticks.
    pub fn total_ticks(&self) -> u64 {
        (1..=self.measure_count)
            .map(|m| u64::from(self.measure_length(m)))
            .sum()
    }

    /// Split the piece into runs of measures sharing a time signature.
    pub fn time_regions(&self) -> Vec<TimeRegion> {
        let starts: Vec<(u32, TimeSignature)> = self
            .time_map
            .iter()
            .filter(|(m, _)| **m <= self.measure_count)
            .map(|(m, ts)| (*m, *ts))
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(i, (start, signature))| {
                let end = starts
                    .get(i + 1)
                    .map(|(next, _)| *next)
                    .unwrap_or(self.measure_count + 1);
                TimeRegion {
                    start_measure: *start,
                    measure_count: end - start,
                    signature: *signature,
                }
            })
            .collect()
    }
}

/// Everything the extractor recovers from one score.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub meta: PieceMeta,
    pub melody: Vec<NoteEvent>,
    pub chords: BTreeMap<u32, ChordEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_pitch_formula() {
        let c4 = NoteEvent::pitched(Step::C, 0, 4, 24, 0);
        assert_eq!(c4.midi_pitch(OctaveConvention::International), Some(60));
        assert_eq!(c4.midi_pitch(OctaveConvention::Yamaha), Some(72));

        let c5 = NoteEvent::pitched(Step::C, 0, 5, 24, 0);
        assert_eq!(c5.midi_pitch(OctaveConvention::International), Some(72));

        let c3 = NoteEvent::pitched(Step::C, 0, 3, 24, 0);
        assert_eq!(c3.midi_pitch(OctaveConvention::Yamaha), Some(60));

        let b_flat = NoteEvent::pitched(Step::B, -1, 3, 24, 0);
        assert_eq!(b_flat.midi_pitch(OctaveConvention::International), Some(58));

        let f_double_sharp = NoteEvent::pitched(Step::F, 2, 4, 24, 0);
        assert_eq!(f_double_sharp.midi_pitch(OctaveConvention::International), Some(67));

        assert_eq!(NoteEvent::rest(24, 0).midi_pitch(OctaveConvention::International), None);
    }

    #[test]
    fn test_note_type_boundaries() {
        let ty = |duration| NoteEvent::pitched(Step::C, 0, 4, duration, 0).note_type(24).unwrap();
        assert_eq!(ty(24), NoteType::Quarter);
        assert_eq!(ty(12), NoteType::Eighth);
        assert_eq!(ty(48), NoteType::Half);
        assert_eq!(ty(6), NoteType::Sixteenth);
        assert_eq!(ty(3), NoteType::ThirtySecond);
        assert_eq!(ty(96), NoteType::Whole);
        assert_eq!(ty(192), NoteType::Breve);
        // Dotted values stay in their undotted bucket
        assert_eq!(ty(36), NoteType::Quarter);
        assert_eq!(ty(18), NoteType::Eighth);
        assert_eq!(ty(72), NoteType::Half);
    }

    #[test]
    fn test_note_type_out_of_range() {
        let short = NoteEvent::pitched(Step::C, 0, 4, 1, 0);
        assert!(matches!(
            short.note_type(24),
            Err(ConvertError::UnclassifiableDuration { duration: 1, divisions: 24 })
        ));
        let long = NoteEvent::rest(384, 0);
        assert!(long.note_type(24).is_err());
    }

    #[test]
    fn test_tuplet_note_types() {
        let quarter_triplet = NoteEvent::pitched(Step::C, 0, 4, 16, 0).with_tuplet();
        assert_eq!(quarter_triplet.note_type(24).unwrap(), NoteType::Quarter);

        let eighth_triplet = NoteEvent::pitched(Step::C, 0, 4, 8, 0).with_tuplet();
        assert_eq!(eighth_triplet.note_type(24).unwrap(), NoteType::Eighth);

        let quintuplet = NoteEvent::pitched(Step::C, 0, 4, 6, 0).with_tuplet();
        assert!(matches!(
            quintuplet.note_type(24),
            Err(ConvertError::UnsupportedTuplet { duration: 6, divisions: 24 })
        ));
    }

    #[test]
    fn test_chord_symbol() {
        assert_eq!(ChordEvent::new("C", 0, "major", "").symbol(), "C");
        assert_eq!(ChordEvent::new("F", 1, "minor-seventh", "m7").symbol(), "F♯m7");

        let mut add9 = ChordEvent::new("G", 0, "dominant", "7");
        add9.set_tension(9, -1, "add");
        assert_eq!(add9.symbol(), "G7(♭9)");

        let mut slash = ChordEvent::new("A", -1, "major", "");
        slash.set_bass("C", 0);
        assert_eq!(slash.symbol(), "A♭/C");
    }

    #[test]
    fn test_meta_defaults() {
        let meta = PieceMeta::new();
        assert_eq!(meta.measure_count(), 1);
        assert_eq!(meta.divisions, DEFAULT_DIVISIONS);
        assert_eq!(meta.time_at(1), TimeSignature::COMMON);
        assert_eq!(meta.key_at(1), 0);
        assert_eq!(meta.tempo_at(1), TempoMark::new(120, "quarter", 120));
    }

    #[test]
    fn test_meta_setters_reject_out_of_range_measures() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(8).unwrap();
        assert!(meta.set_time(9, TimeSignature::new(3, 4)).is_err());
        assert!(meta.set_key(0, 2).is_err());
        assert!(meta.set_time(8, TimeSignature::new(3, 4)).is_ok());
        assert!(meta.set_measure_count(7).is_err());
        assert!(meta.set_divisions(0).is_err());
    }

    #[test]
    fn test_effective_entries() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(10).unwrap();
        meta.set_time(5, TimeSignature::new(3, 4)).unwrap();
        meta.set_key(3, -2).unwrap();
        assert_eq!(meta.time_at(4), TimeSignature::COMMON);
        assert_eq!(meta.time_at(5), TimeSignature::new(3, 4));
        assert_eq!(meta.time_at(10), TimeSignature::new(3, 4));
        assert_eq!(meta.key_at(2), 0);
        assert_eq!(meta.key_at(9), -2);
    }

    #[test]
    fn test_time_regions() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(12).unwrap();
        meta.set_time(5, TimeSignature::new(3, 4)).unwrap();
        meta.set_time(7, TimeSignature::new(4, 4)).unwrap();

        let regions = meta.time_regions();
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[0].start_measure, regions[0].measure_count), (1, 4));
        assert_eq!((regions[1].start_measure, regions[1].measure_count), (5, 2));
        assert_eq!((regions[2].start_measure, regions[2].measure_count), (7, 6));
        assert_eq!(regions[1].signature, TimeSignature::new(3, 4));
    }

    #[test]
    fn test_measure_ticks() {
        assert_eq!(TimeSignature::new(4, 4).measure_ticks(24), 96);
        assert_eq!(TimeSignature::new(3, 4).measure_ticks(24), 72);
        assert_eq!(TimeSignature::new(6, 8).measure_ticks(24), 72);
        assert_eq!(TimeSignature::new(2, 2).measure_ticks(4), 16);

        let mut meta = PieceMeta::new();
        meta.set_divisions(24).unwrap();
        meta.set_measure_count(3).unwrap();
        meta.upbeat_length = 24;
        assert_eq!(meta.measure_length(1), 24);
        assert_eq!(meta.measure_length(2), 96);
        assert_eq!(meta.total_ticks(), 24 + 96 * 2);
    }

    #[test]
    fn test_printed_measure_numbers() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(5).unwrap();
        assert_eq!(meta.measure_number(1), 1);
        assert_eq!(meta.last_measure_number(), 5);

        meta.first_number = 0;
        assert_eq!(meta.measure_number(1), 0);
        assert_eq!(meta.measure_number(2), 1);
        assert_eq!(meta.last_measure_number(), 4);
    }
}
