//! # Score Synthesizer
//!
//! Rebuilds a single-part MusicXML score from piece metadata, a melody and
//! a chord map.
//!
//! The output is an [`XmlElement`] tree; serialize it with
//! [`XmlElement::to_document_string`]. Measures are filled by walking a
//! clock through the melody: every note must start exactly where the
//! previous one ended, and the measure grid must be covered without gaps.

use crate::error::{ConvertError, Result};
use crate::model::{ChordEvent, NoteEvent, PieceMeta, TempoMark, TimeSignature};
use crate::xml::XmlElement;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Fixed preamble settings for synthesized scores.
///
/// The layout defaults are a plain A4 portrait page.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub rights: String,
    pub software: String,
    /// `YYYY-MM-DD`; today's date when unset.
    pub encoding_date: Option<String>,
    pub part_name: String,
    pub part_abbreviation: String,
    pub midi_port: u32,
    pub midi_channel: u32,
    pub midi_program: u32,
    pub volume: f64,
    pub pan: f64,
    pub millimeters: f64,
    pub tenths: f64,
    pub page_height: f64,
    pub page_width: f64,
    /// Left, right, top, bottom.
    pub page_margins: [f64; 4],
    pub word_font_family: String,
    pub word_font_size: f64,
    pub lyric_font_family: String,
    pub lyric_font_size: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            rights: "----".to_string(),
            software: env!("CARGO_PKG_NAME").to_string(),
            encoding_date: None,
            part_name: "Piano".to_string(),
            part_abbreviation: "Pno.".to_string(),
            midi_port: 1,
            midi_channel: 1,
            midi_program: 1,
            volume: 78.7402,
            pan: 0.0,
            millimeters: 7.05556,
            tenths: 40.0,
            page_height: 1683.78,
            page_width: 1190.55,
            page_margins: [56.6929, 56.6929, 56.6929, 113.386],
            word_font_family: "FreeSerif".to_string(),
            word_font_size: 10.0,
            lyric_font_family: "FreeSerif".to_string(),
            lyric_font_size: 11.0,
        }
    }
}

impl SynthConfig {
    fn encoding_date(&self) -> String {
        self.encoding_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
    }
}

const PART_ID: &str = "P1";
const INSTRUMENT_ID: &str = "P1-I1";

/// Build a `score-partwise` tree for one melody part.
///
/// # Example
/// ```rust
/// use melodyroll::{synthesize, ChordEvent, NoteEvent, PieceMeta, Step, SynthConfig};
/// use std::collections::BTreeMap;
///
/// let meta = PieceMeta::new();
/// let melody = vec![
///     NoteEvent::pitched(Step::E, 0, 4, 8, 0),
///     NoteEvent::rest(8, 8),
/// ];
/// let chords = BTreeMap::from([(0, ChordEvent::new("C", 0, "major", ""))]);
///
/// let score = synthesize(&meta, &melody, &chords, &SynthConfig::default())?;
/// let measure = score.child("part").and_then(|p| p.child("measure")).unwrap();
/// assert_eq!(measure.children_named("note").count(), 2);
/// assert!(measure.child("harmony").is_some());
/// # Ok::<(), melodyroll::ConvertError>(())
/// ```
///
/// # Errors
/// - [`ConvertError::ClockMismatch`] when a note does not start where the clock is
/// - [`ConvertError::UnsupportedTuplet`] / [`ConvertError::UnclassifiableDuration`]
///   when a note value cannot be written
pub fn synthesize(
    meta: &PieceMeta,
    melody: &[NoteEvent],
    chords: &BTreeMap<u32, ChordEvent>,
    config: &SynthConfig,
) -> Result<XmlElement> {
    let mut score = XmlElement::new("score-partwise").attr("version", "3.0");
    score.push(identification(config));
    score.push(defaults(config));
    score.push(part_list(config));

    let mut part = XmlElement::new("part").attr("id", PART_ID);
    let mut writer = MeasureWriter {
        meta,
        melody,
        chords,
        clock: 0,
        next: 0,
        placed_chords: BTreeSet::new(),
    };
    for number in 1..=meta.measure_count() {
        part.push(writer.measure(number)?);
    }

    if writer.next < melody.len() {
        warn!(
            notes = melody.len() - writer.next,
            tick = writer.clock,
            "notes after the final measure were not written"
        );
    }
    for tick in chords.keys().filter(|t| !writer.placed_chords.contains(t)) {
        warn!(tick, "chord does not coincide with a note start, dropped");
    }

    score.push(part);
    debug!(measures = meta.measure_count(), notes = writer.next, "synthesized score");
    Ok(score)
}

struct MeasureWriter<'a> {
    meta: &'a PieceMeta,
    melody: &'a [NoteEvent],
    chords: &'a BTreeMap<u32, ChordEvent>,
    clock: u32,
    /// Index of the next melody note to place.
    next: usize,
    placed_chords: BTreeSet<u32>,
}

impl MeasureWriter<'_> {
    fn measure(&mut self, number: u32) -> Result<XmlElement> {
        let mut measure = XmlElement::new("measure").attr("number", self.meta.measure_number(number));
        if number == 1 && self.meta.upbeat_length > 0 {
            measure = measure.attr("implicit", "yes");
        }

        if let Some(attributes) = self.attributes(number) {
            measure.push(attributes);
        }
        if let Some(tempo) = self.meta.tempo_map().get(&number) {
            measure.push(tempo_direction(tempo));
        }

        let (melody, chords) = (self.melody, self.chords);
        let end = self
            .clock
            .checked_add(self.meta.measure_length(number))
            .ok_or_else(|| ConvertError::Malformed {
                measure: number,
                message: "measure ends past the tick counter".to_string(),
            })?;
        while self.clock < end {
            let clock = self.clock;
            if let Some(chord) = chords.get(&clock) {
                measure.push(harmony_element(chord));
                self.placed_chords.insert(clock);
            }

            let next = melody.get(self.next);
            let note = next
                .filter(|n| n.start_time == clock)
                .ok_or(ConvertError::ClockMismatch {
                    measure: number,
                    expected: clock,
                    found: next.map(|n| n.start_time),
                })?;
            measure.push(note_element(note, self.meta.divisions)?);
            self.clock = clock.checked_add(note.duration).ok_or_else(|| ConvertError::Malformed {
                measure: number,
                message: format!("note at tick {} ends past the tick counter", clock),
            })?;
            self.next += 1;
        }
        Ok(measure)
    }

    fn attributes(&self, number: u32) -> Option<XmlElement> {
        let mut attributes = XmlElement::new("attributes");
        if number == 1 {
            attributes.push_text("divisions", self.meta.divisions);
        }
        if let Some(fifths) = self.meta.key_map().get(&number) {
            let mut key = XmlElement::new("key");
            key.push_text("fifths", fifths);
            attributes.push(key);
        }
        if let Some(signature) = self.meta.time_map().get(&number) {
            attributes.push(time_element(*signature));
        }
        (!attributes.children.is_empty()).then_some(attributes)
    }
}

fn time_element(signature: TimeSignature) -> XmlElement {
    let mut time = XmlElement::new("time");
    time.push_text("beats", signature.beats)
        .push_text("beat-type", signature.beat_type);
    time
}

fn tempo_direction(tempo: &TempoMark) -> XmlElement {
    let mut metronome = XmlElement::new("metronome").attr("parentheses", "no");
    metronome
        .push_text("beat-unit", &tempo.beat_unit)
        .push_text("per-minute", tempo.bpm);
    let mut direction_type = XmlElement::new("direction-type");
    direction_type.push(metronome);

    let mut direction = XmlElement::new("direction").attr("placement", "above");
    direction
        .push(direction_type)
        .push(XmlElement::new("sound").attr("tempo", tempo.sound_bpm));
    direction
}

/// `<note>` for a melody note: pitch or rest, duration, voice, type and
/// a 3:2 time modification for triplets.
fn note_element(note: &NoteEvent, divisions: u32) -> Result<XmlElement> {
    let note_type = note.note_type(divisions)?;

    let mut element = XmlElement::new("note");
    if note.is_rest() {
        element.push(XmlElement::new("rest"));
    } else {
        let mut pitch = XmlElement::new("pitch");
        pitch.push_text("step", note.step);
        if note.alter != 0 {
            pitch.push_text("alter", note.alter);
        }
        pitch.push_text("octave", note.octave);
        element.push(pitch);
    }
    element
        .push_text("duration", note.duration)
        .push_text("voice", 1)
        .push_text("type", note_type.musicxml_type());

    if note.is_tuplet {
        let mut modification = XmlElement::new("time-modification");
        modification
            .push_text("actual-notes", 3)
            .push_text("normal-notes", 2);
        element.push(modification);
    }
    Ok(element)
}

fn harmony_element(chord: &ChordEvent) -> XmlElement {
    let mut harmony = XmlElement::new("harmony").attr("print-frame", "no");

    let mut root = XmlElement::new("root");
    root.push_text("root-step", &chord.root_step);
    if chord.root_alter != 0 {
        root.push_text("root-alter", chord.root_alter);
    }
    harmony.push(root);

    let mut kind = XmlElement::new("kind").attr("text", &chord.kind_text);
    if chord.has_tension() {
        kind = kind.attr("parentheses-degrees", "yes");
    }
    if !chord.kind.is_empty() {
        kind.text = Some(chord.kind.clone());
    }
    harmony.push(kind);

    if chord.has_tension() {
        let mut degree = XmlElement::new("degree");
        degree
            .push_text("degree-value", chord.tension_degree)
            .push_text("degree-alter", chord.tension_alter)
            .push_text("degree-type", &chord.tension_type);
        harmony.push(degree);
    }

    if chord.is_slash_chord() {
        let mut bass = XmlElement::new("bass");
        bass.push_text("bass-step", &chord.bass_step);
        if chord.bass_alter != 0 {
            bass.push_text("bass-alter", chord.bass_alter);
        }
        harmony.push(bass);
    }
    harmony
}

fn identification(config: &SynthConfig) -> XmlElement {
    let mut encoding = XmlElement::new("encoding");
    encoding
        .push_text("software", &config.software)
        .push_text("encoding-date", config.encoding_date());
    for (element, attribute) in [
        ("accidental", None),
        ("beam", None),
        ("print", Some("new-page")),
        ("print", Some("new-system")),
        ("stem", None),
    ] {
        let mut supports = XmlElement::new("supports").attr("element", element);
        if let Some(attribute) = attribute {
            supports = supports.attr("attribute", attribute);
        }
        supports = supports.attr("type", "yes");
        if attribute.is_some() {
            supports = supports.attr("value", "yes");
        }
        encoding.push(supports);
    }

    let mut identification = XmlElement::new("identification");
    identification.push_text("rights", &config.rights).push(encoding);
    identification
}

fn defaults(config: &SynthConfig) -> XmlElement {
    let mut scaling = XmlElement::new("scaling");
    scaling
        .push_text("millimeters", config.millimeters)
        .push_text("tenths", config.tenths);

    let mut page_layout = XmlElement::new("page-layout");
    page_layout
        .push_text("page-height", config.page_height)
        .push_text("page-width", config.page_width);
    for side in ["even", "odd"] {
        let [left, right, top, bottom] = config.page_margins;
        let mut margins = XmlElement::new("page-margins").attr("type", side);
        margins
            .push_text("left-margin", left)
            .push_text("right-margin", right)
            .push_text("top-margin", top)
            .push_text("bottom-margin", bottom);
        page_layout.push(margins);
    }

    let mut defaults = XmlElement::new("defaults");
    defaults
        .push(scaling)
        .push(page_layout)
        .push(
            XmlElement::new("word-font")
                .attr("font-family", &config.word_font_family)
                .attr("font-size", config.word_font_size),
        )
        .push(
            XmlElement::new("lyric-font")
                .attr("font-family", &config.lyric_font_family)
                .attr("font-size", config.lyric_font_size),
        );
    defaults
}

fn part_list(config: &SynthConfig) -> XmlElement {
    let mut instrument = XmlElement::new("score-instrument").attr("id", INSTRUMENT_ID);
    instrument.push_text("instrument-name", &config.part_name);

    let mut midi = XmlElement::new("midi-instrument").attr("id", INSTRUMENT_ID);
    midi.push_text("midi-channel", config.midi_channel)
        .push_text("midi-program", config.midi_program)
        .push_text("volume", config.volume)
        .push_text("pan", config.pan);

    let mut score_part = XmlElement::new("score-part").attr("id", PART_ID);
    score_part
        .push_text("part-name", &config.part_name)
        .push_text("part-abbreviation", &config.part_abbreviation)
        .push(instrument)
        .push(
            XmlElement::new("midi-device")
                .attr("id", INSTRUMENT_ID)
                .attr("port", config.midi_port),
        )
        .push(midi);

    let mut part_list = XmlElement::new("part-list");
    part_list.push(score_part);
    part_list
}
