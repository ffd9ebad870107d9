//! # Score Extractor
//!
//! Reads a MusicXML `score-partwise` document and recovers the piece
//! metadata, the melody of the first part and the chord symbols of every
//! part.
//!
//! ## Pipeline
//! 1. Parse the text with `roxmltree`
//! 2. Lower each measure child into a [`ScoreItem`] through [`DISPATCH`]
//! 3. Replay the items against a per-part clock
//!
//! ## Voices
//! Only the top voice survives. Notes flagged `<chord/>` are stacked under
//! the previous note and are dropped. After a `<backup>` the clock sits
//! behind the furthest tick already read; notes starting there belong to a
//! lower voice and only move the clock. A `<forward>` in the top voice is
//! read as a rest so the melody stays contiguous.
//!
//! ## Secondary Parts
//! Parts after the first add chord symbols only. Their chord ticks are
//! rescaled to the first part's divisions, and their note pitches are never
//! read. A chord landing on a tick that already holds one replaces it.
//!
//! ## Measure Numbers
//! Measures are counted from 1 in document order. The printed `number` of
//! the first measure is kept in [`PieceMeta::first_number`] so windows and
//! regenerated scores follow the document's own numbering.

use crate::error::{ConvertError, Result};
use crate::model::{ChordEvent, Extraction, NoteEvent, PieceMeta, Step, TempoMark, TimeSignature};
use roxmltree::{Document, Node, ParsingOptions};
use std::str::FromStr;
use tracing::{debug, warn};

/// One measure-level element, lowered from XML.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreItem {
    Attributes(AttributesItem),
    Direction(DirectionItem),
    Harmony(ChordEvent),
    Note(NoteItem),
    /// Move the clock back by this many ticks.
    Backup(u32),
    /// Move the clock forward by this many ticks.
    Forward(u32),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributesItem {
    pub fifths: Option<i32>,
    pub divisions: Option<u32>,
    pub time: Option<TimeSignature>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectionItem {
    /// Playback tempo from `<sound tempo>`.
    pub sound_tempo: Option<u32>,
    /// Printed metronome mark as `(beat unit, per-minute)`.
    pub metronome: Option<(String, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePitch {
    Pitched { step: Step, alter: i32, octave: i32 },
    Rest,
    Unpitched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteItem {
    /// Stacked under the previous note (`<chord/>`).
    pub chord: bool,
    /// `None` for grace notes.
    pub duration: Option<u32>,
    pub pitch: NotePitch,
    pub tuplet: bool,
}

type Lowering = fn(Node, u32) -> Result<ScoreItem>;

/// Tag name to lowering function. Tags not listed here are skipped.
pub const DISPATCH: &[(&str, Lowering)] = &[
    ("attributes", lower_attributes),
    ("direction", lower_direction),
    ("harmony", lower_harmony),
    ("note", lower_note),
    ("backup", lower_backup),
    ("forward", lower_forward),
];

/// Lower a measure child, or `None` if its tag carries nothing we read.
pub fn lower(node: Node, measure: u32) -> Result<Option<ScoreItem>> {
    let tag = node.tag_name().name();
    match DISPATCH.iter().find(|(name, _)| *name == tag) {
        Some((_, lowering)) => lowering(node, measure).map(Some),
        None => Ok(None),
    }
}

/// Like [`lower`], but notes keep only their timing.
pub fn lower_secondary(node: Node, measure: u32) -> Result<Option<ScoreItem>> {
    if node.tag_name().name() == "note" {
        return lower_note_timing(node, measure).map(|note| Some(ScoreItem::Note(note)));
    }
    lower(node, measure)
}

/// Extract metadata, melody and chords from a MusicXML document.
///
/// # Example
/// ```rust
/// use melodyroll::extract;
///
/// let xml = r#"<score-partwise>
///   <part id="P1">
///     <measure number="1">
///       <attributes><divisions>1</divisions></attributes>
///       <harmony><root><root-step>C</root-step></root><kind text="">major</kind></harmony>
///       <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
///     </measure>
///   </part>
/// </score-partwise>"#;
///
/// let extraction = extract(xml)?;
/// assert_eq!(extraction.meta.divisions, 1);
/// assert_eq!(extraction.melody.len(), 1);
/// assert_eq!(extraction.chords[&0].symbol(), "C");
/// # Ok::<(), melodyroll::ConvertError>(())
/// ```
///
/// # Errors
/// Returns [`ConvertError::Xml`] for unparsable text and
/// [`ConvertError::Malformed`] when a mandatory element is missing.
pub fn extract(xml: &str) -> Result<Extraction> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| ConvertError::Xml(e.to_string()))?;

    let root = doc.root_element();
    if root.tag_name().name() != "score-partwise" {
        return Err(ConvertError::Malformed {
            measure: 0,
            message: format!("expected <score-partwise>, found <{}>", root.tag_name().name()),
        });
    }

    let mut extraction = Extraction::default();
    for (index, part) in children_named(root, "part").enumerate() {
        let mut scanner = PartScanner::new(index == 0);
        scanner.scan(part, &mut extraction)?;
        debug!(
            part = part.attribute("id").unwrap_or("?"),
            primary = (index == 0),
            "scanned part"
        );
    }

    debug!(
        measures = extraction.meta.measure_count(),
        notes = extraction.melody.len(),
        chords = extraction.chords.len(),
        "extraction complete"
    );
    Ok(extraction)
}

/// Clock and voice state for one part.
struct PartScanner {
    primary: bool,
    cur_time: u32,
    /// Furthest tick reached so far; notes starting before it are in a rewound voice.
    frontier: u32,
    divisions: u32,
}

impl PartScanner {
    fn new(primary: bool) -> Self {
        Self {
            primary,
            cur_time: 0,
            frontier: 0,
            divisions: 0,
        }
    }

    fn scan(&mut self, part: Node, extraction: &mut Extraction) -> Result<()> {
        for (index, measure_node) in children_named(part, "measure").enumerate() {
            let number = index as u32 + 1;
            let measure_start = self.cur_time;

            let implicit = measure_node.attribute("implicit") == Some("yes");

            if self.primary && number > extraction.meta.measure_count() {
                extraction.meta.set_measure_count(number)?;
            }
            if self.primary && number == 1 {
                extraction.meta.first_number = measure_node
                    .attribute("number")
                    .and_then(|n| n.trim().parse::<u32>().ok())
                    .unwrap_or(if implicit { 0 } else { 1 });
            }

            for child in measure_node.children().filter(|n| n.is_element()) {
                let item = if self.primary {
                    lower(child, number)?
                } else {
                    lower_secondary(child, number)?
                };
                if let Some(item) = item {
                    self.apply(item, number, extraction)?;
                }
            }

            if self.primary && number == 1 && implicit {
                extraction.meta.upbeat_length = self.frontier - measure_start;
                debug!(ticks = extraction.meta.upbeat_length, "pickup measure");
            }
        }
        Ok(())
    }

    fn apply(&mut self, item: ScoreItem, measure: u32, extraction: &mut Extraction) -> Result<()> {
        match item {
            ScoreItem::Backup(ticks) => {
                self.cur_time = self.cur_time.checked_sub(ticks).ok_or_else(|| {
                    ConvertError::Malformed {
                        measure,
                        message: format!(
                            "backup of {} ticks rewinds before the start of the part (clock at {})",
                            ticks, self.cur_time
                        ),
                    }
                })?;
            }
            ScoreItem::Forward(ticks) => {
                if self.primary && ticks > 0 && self.cur_time >= self.frontier {
                    extraction.melody.push(NoteEvent::rest(ticks, self.cur_time));
                }
                self.advance(ticks, measure)?;
            }
            ScoreItem::Attributes(attrs) => self.apply_attributes(attrs, measure, &mut extraction.meta)?,
            ScoreItem::Direction(direction) => {
                if self.primary {
                    apply_direction(direction, measure, &mut extraction.meta)?;
                }
            }
            ScoreItem::Harmony(chord) => {
                let tick = self.chord_tick(extraction.meta.divisions, measure)?;
                extraction.chords.insert(tick, chord);
            }
            ScoreItem::Note(note) => self.apply_note(note, measure, &mut extraction.melody)?,
        }
        Ok(())
    }

    fn apply_attributes(&mut self, attrs: AttributesItem, measure: u32, meta: &mut PieceMeta) -> Result<()> {
        if let Some(divisions) = attrs.divisions {
            if divisions == 0 {
                return Err(ConvertError::Malformed {
                    measure,
                    message: "divisions must be positive".to_string(),
                });
            }
            if self.primary {
                if measure > 1 && divisions != meta.divisions {
                    warn!(measure, from = meta.divisions, to = divisions, "divisions changed mid-part");
                }
                meta.set_divisions(divisions)?;
            }
            self.divisions = divisions;
        }
        if !self.primary {
            return Ok(());
        }
        if let Some(fifths) = attrs.fifths {
            meta.set_key(measure, fifths)?;
        }
        if let Some(time) = attrs.time {
            meta.set_time(measure, time).map_err(|e| ConvertError::Malformed {
                measure,
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn apply_note(&mut self, note: NoteItem, measure: u32, melody: &mut Vec<NoteEvent>) -> Result<()> {
        let duration = match note.duration {
            Some(d) if d > 0 && !note.chord => d,
            _ => return Ok(()),
        };

        let start = self.cur_time;
        if self.primary && start >= self.frontier {
            let event = match note.pitch {
                NotePitch::Pitched { step, alter, octave } => {
                    NoteEvent::pitched(step, alter, octave, duration, start)
                }
                NotePitch::Rest => NoteEvent::rest(duration, start),
                NotePitch::Unpitched => {
                    return Err(ConvertError::Malformed {
                        measure,
                        message: "melody note has neither <pitch> nor <rest>".to_string(),
                    })
                }
            };
            melody.push(if note.tuplet { event.with_tuplet() } else { event });
        }
        self.advance(duration, measure)
    }

    fn advance(&mut self, ticks: u32, measure: u32) -> Result<()> {
        self.cur_time = self
            .cur_time
            .checked_add(ticks)
            .ok_or_else(|| tick_overflow(measure, self.cur_time, ticks))?;
        self.frontier = self.frontier.max(self.cur_time);
        Ok(())
    }

    /// Current clock expressed in the primary part's divisions.
    fn chord_tick(&self, primary_divisions: u32, measure: u32) -> Result<u32> {
        if self.primary || self.divisions == 0 || self.divisions == primary_divisions {
            return Ok(self.cur_time);
        }
        let tick = u64::from(self.cur_time) * u64::from(primary_divisions) / u64::from(self.divisions);
        u32::try_from(tick).map_err(|_| ConvertError::Malformed {
            measure,
            message: format!("chord at tick {} does not fit the tick counter", tick),
        })
    }
}

fn apply_direction(direction: DirectionItem, measure: u32, meta: &mut PieceMeta) -> Result<()> {
    let tempo = match (direction.metronome, direction.sound_tempo) {
        (Some((unit, bpm)), Some(sound)) => TempoMark::new(bpm, &unit, sound),
        (Some((unit, bpm)), None) => TempoMark::new(bpm, &unit, bpm),
        (None, Some(sound)) => TempoMark::new(sound, "quarter", sound),
        (None, None) => return Ok(()),
    };
    meta.set_tempo(measure, tempo)
}

fn lower_attributes(node: Node, measure: u32) -> Result<ScoreItem> {
    let fifths = match child(node, "key") {
        Some(key) => parse_child::<i32>(key, "fifths", measure)?,
        None => None,
    };
    let divisions = parse_child::<u32>(node, "divisions", measure)?;
    let time = match child(node, "time") {
        Some(time) => {
            let beats = parse_child::<u32>(time, "beats", measure)?;
            let beat_type = parse_child::<u32>(time, "beat-type", measure)?;
            match (beats, beat_type) {
                (Some(beats), Some(beat_type)) => Some(TimeSignature::new(beats, beat_type)),
                // senza-misura and other unmetered signatures
                _ => None,
            }
        }
        None => None,
    };
    Ok(ScoreItem::Attributes(AttributesItem {
        fifths,
        divisions,
        time,
    }))
}

fn lower_direction(node: Node, measure: u32) -> Result<ScoreItem> {
    let sound_tempo = match child(node, "sound").and_then(|s| s.attribute("tempo")) {
        Some(text) => Some(parse_bpm(text).ok_or_else(|| malformed(measure, "sound tempo", text))?),
        None => None,
    };

    let metronome = children_named(node, "direction-type")
        .find_map(|dt| child(dt, "metronome"))
        .and_then(|metronome| {
            let unit = child_text(metronome, "beat-unit").unwrap_or("quarter").trim();
            let per_minute = child_text(metronome, "per-minute")?;
            match parse_bpm(per_minute) {
                Some(bpm) => Some((unit.to_string(), bpm)),
                None => {
                    warn!(measure, per_minute, "ignoring metronome without a numeric rate");
                    None
                }
            }
        });

    Ok(ScoreItem::Direction(DirectionItem {
        sound_tempo,
        metronome,
    }))
}

fn lower_harmony(node: Node, measure: u32) -> Result<ScoreItem> {
    let root = child(node, "root");
    let root_step = root
        .and_then(|r| child_text(r, "root-step"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConvertError::Malformed {
            measure,
            message: "harmony without root-step".to_string(),
        })?;
    let root_alter = match root {
        Some(r) => parse_child::<i32>(r, "root-alter", measure)?.unwrap_or(0),
        None => 0,
    };

    let kind = child(node, "kind");
    let kind_value = kind.and_then(|k| k.text()).unwrap_or("").trim();
    let kind_text = kind.and_then(|k| k.attribute("text")).unwrap_or("");
    let mut chord = ChordEvent::new(root_step, root_alter, kind_value, kind_text);

    if let Some(degree) = child(node, "degree") {
        let value = parse_child::<i32>(degree, "degree-value", measure)?.ok_or_else(|| {
            ConvertError::Malformed {
                measure,
                message: "degree without degree-value".to_string(),
            }
        })?;
        let alter = parse_child::<i32>(degree, "degree-alter", measure)?.unwrap_or(0);
        let degree_type = child_text(degree, "degree-type").unwrap_or("add").trim();
        chord.set_tension(value, alter, degree_type);
    }

    if let Some(bass) = child(node, "bass") {
        let step = child_text(bass, "bass-step")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConvertError::Malformed {
                measure,
                message: "bass without bass-step".to_string(),
            })?;
        let alter = parse_child::<i32>(bass, "bass-alter", measure)?.unwrap_or(0);
        chord.set_bass(step, alter);
    }

    Ok(ScoreItem::Harmony(chord))
}

/// Duration and flags of a note; the pitch is left [`NotePitch::Unpitched`].
fn lower_note_timing(node: Node, measure: u32) -> Result<NoteItem> {
    let duration = match child_text(node, "duration") {
        Some(text) => Some(parse_ticks(text).ok_or_else(|| malformed(measure, "duration", text))?),
        None => None,
    };
    Ok(NoteItem {
        chord: child(node, "chord").is_some(),
        duration,
        pitch: NotePitch::Unpitched,
        tuplet: child(node, "time-modification").is_some(),
    })
}

fn lower_note(node: Node, measure: u32) -> Result<ScoreItem> {
    let mut note = lower_note_timing(node, measure)?;
    note.pitch = if let Some(pitch) = child(node, "pitch") {
        let step_text = child_text(pitch, "step").ok_or_else(|| ConvertError::Malformed {
            measure,
            message: "pitch without step".to_string(),
        })?;
        let step = Step::from_letter(step_text).ok_or_else(|| malformed(measure, "step", step_text))?;
        let octave = parse_child::<i32>(pitch, "octave", measure)?.ok_or_else(|| {
            ConvertError::Malformed {
                measure,
                message: "pitch without octave".to_string(),
            }
        })?;
        let alter = match child_text(pitch, "alter") {
            // microtonal alters round to the nearest semitone
            Some(text) => f64::from_str(text.trim())
                .map(|a| a.round() as i32)
                .map_err(|_| malformed(measure, "alter", text))?,
            None => 0,
        };
        NotePitch::Pitched { step, alter, octave }
    } else if child(node, "rest").is_some() {
        NotePitch::Rest
    } else {
        NotePitch::Unpitched
    };
    Ok(ScoreItem::Note(note))
}

fn lower_backup(node: Node, measure: u32) -> Result<ScoreItem> {
    required_ticks(node, "backup", measure).map(ScoreItem::Backup)
}

fn lower_forward(node: Node, measure: u32) -> Result<ScoreItem> {
    required_ticks(node, "forward", measure).map(ScoreItem::Forward)
}

fn required_ticks(node: Node, tag: &str, measure: u32) -> Result<u32> {
    let text = child_text(node, "duration").ok_or_else(|| ConvertError::Malformed {
        measure,
        message: format!("{} without duration", tag),
    })?;
    parse_ticks(text).ok_or_else(|| malformed(measure, "duration", text))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.tag_name().name() == name)
}

fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.tag_name().name() == name)
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text())
}

fn parse_child<T: FromStr>(node: Node, name: &str, measure: u32) -> Result<Option<T>> {
    match child_text(node, name) {
        Some(text) => text
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| malformed(measure, name, text)),
        None => Ok(None),
    }
}

/// Tick counts are integral in practice but the schema allows decimals.
fn parse_ticks(text: &str) -> Option<u32> {
    let text = text.trim();
    text.parse::<u32>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u32)
    })
}

fn parse_bpm(text: &str) -> Option<u32> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u32)
}

fn tick_overflow(measure: u32, clock: u32, ticks: u32) -> ConvertError {
    ConvertError::Malformed {
        measure,
        message: format!("advancing {} ticks from tick {} overflows the tick counter", ticks, clock),
    }
}

fn malformed(measure: u32, element: &str, value: &str) -> ConvertError {
    ConvertError::Malformed {
        measure,
        message: format!("unreadable <{}> value '{}'", element, value.trim()),
    }
}
