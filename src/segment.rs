//! # Segmenter / Encoder
//!
//! Cuts a melody into overlapping fixed-length windows and encodes each one
//! as a binary piano roll.
//!
//! ## Windows
//! Only 4/4 time regions with at least `window_measures` measures are
//! encoded. Windows slide one measure at a time, so a region of `n`
//! measures yields `n - window_measures + 1` candidates. A candidate is
//! dropped when it holds more than `max_full_rests` whole-measure rests.
//!
//! ## Grid
//! Each quarter note spans `grid_resolution` rows. A sounding pitch fills
//! every row it covers (hold encoding, no onset marker). The emitted roll
//! is pitch-major with the highest pitch on row 0 and time running along
//! the columns.

use crate::error::{ConvertError, Result};
use crate::model::{NoteEvent, OctaveConvention, PieceMeta};
use std::fmt;
use tracing::debug;

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Grid rows per quarter note.
    pub grid_resolution: u32,
    /// Lowest encodable MIDI pitch (inclusive).
    pub pitch_low: i32,
    /// Highest encodable MIDI pitch (exclusive).
    pub pitch_high: i32,
    pub window_measures: u32,
    /// Whole-measure rests tolerated per window.
    pub max_full_rests: u32,
    pub octave_convention: OctaveConvention,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 24,
            pitch_low: 36,
            pitch_high: 96,
            window_measures: 4,
            max_full_rests: 1,
            octave_convention: OctaveConvention::International,
        }
    }
}

impl EncoderConfig {
    pub fn pitch_count(&self) -> usize {
        (self.pitch_high - self.pitch_low).max(0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_resolution == 0 {
            return Err(ConvertError::Config("grid-resolution must be positive".to_string()));
        }
        if self.window_measures == 0 {
            return Err(ConvertError::Config("window-measures must be positive".to_string()));
        }
        if self.pitch_low >= self.pitch_high {
            return Err(ConvertError::Config(format!(
                "pitch-low ({}) must be below pitch-high ({})",
                self.pitch_low, self.pitch_high
            )));
        }
        Ok(())
    }

    /// Whether a piece with these divisions maps onto the grid without rounding.
    pub fn accepts_divisions(&self, divisions: u32) -> bool {
        divisions > 0 && self.grid_resolution % divisions == 0
    }
}

/// Measure range a window was cut from (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId {
    pub start_measure: u32,
    pub end_measure: u32,
}

impl WindowId {
    /// Artifact name, `<piece>_<start>-<end>`.
    pub fn file_stem(&self, piece: &str) -> String {
        format!("{}_{}", piece, self)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_measure, self.end_measure)
    }
}

/// Binary piano roll, pitch-major: row 0 is the highest pitch, columns are time steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PianoRoll {
    pitches: usize,
    time_steps: usize,
    pitch_low: i32,
    data: Vec<u8>,
}

impl PianoRoll {
    /// Flip a time-major grid (`grid[t * pitches + p]`, `p = 0` lowest) into the emitted layout.
    fn from_time_major(grid: &[u8], time_steps: usize, pitches: usize, pitch_low: i32) -> Self {
        let mut data = vec![0u8; grid.len()];
        for t in 0..time_steps {
            for p in 0..pitches {
                let row = pitches - 1 - p;
                data[row * time_steps + t] = grid[t * pitches + p];
            }
        }
        Self {
            pitches,
            time_steps,
            pitch_low,
            data,
        }
    }

    /// `(rows, columns)` = `(pitches, time steps)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.pitches, self.time_steps)
    }

    /// Shape of the time-major grid before flipping, `(time steps, pitches)`.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.time_steps, self.pitches)
    }

    pub fn get(&self, row: usize, column: usize) -> u8 {
        self.data[row * self.time_steps + column]
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row * self.time_steps..(row + 1) * self.time_steps]
    }

    /// Row holding a MIDI pitch, if the pitch is in range.
    pub fn row_of_pitch(&self, pitch: i32) -> Option<usize> {
        let offset = usize::try_from(pitch - self.pitch_low).ok()?;
        (offset < self.pitches).then(|| self.pitches - 1 - offset)
    }

    /// Row-major cells.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn active_cells(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// One accepted window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: WindowId,
    pub roll: PianoRoll,
}

/// Encode a melody into piano-roll windows.
///
/// # Example
/// ```rust
/// use melodyroll::{encode, EncoderConfig, NoteEvent, PieceMeta, Step};
///
/// let mut meta = PieceMeta::new();
/// meta.set_divisions(24)?;
/// meta.set_measure_count(4)?;
/// let melody: Vec<NoteEvent> = (0..16)
///     .map(|i| NoteEvent::pitched(Step::C, 0, 4, 24, i * 24))
///     .collect();
///
/// let windows = encode(&melody, &meta, &EncoderConfig::default())?;
/// assert_eq!(windows.len(), 1);
/// assert_eq!(windows[0].roll.grid_shape(), (384, 60));
/// # Ok::<(), melodyroll::ConvertError>(())
/// ```
///
/// # Errors
/// - [`ConvertError::IncompatibleDivisions`] if the grid cannot express the piece's ticks
/// - [`ConvertError::NoteNotFound`] if no note starts where a window starts
/// - [`ConvertError::PitchOutOfRange`] if a note lies outside the pitch extent
pub fn encode(melody: &[NoteEvent], meta: &PieceMeta, config: &EncoderConfig) -> Result<Vec<Window>> {
    config.validate()?;
    if !config.accepts_divisions(meta.divisions) {
        return Err(ConvertError::IncompatibleDivisions {
            grid_resolution: config.grid_resolution,
            divisions: meta.divisions,
        });
    }
    let rate = config.grid_resolution / meta.divisions;

    let mut windows = Vec::new();
    let mut cur_time: u32 = 0;

    for (index, region) in meta.time_regions().into_iter().enumerate() {
        let mut usable = region.measure_count;
        let mut first_measure = region.start_measure;
        if index == 0 && region.start_measure == 1 && meta.upbeat_length > 0 {
            cur_time += meta.upbeat_length;
            usable = usable.saturating_sub(1);
            first_measure += 1;
        }

        let measure_len = meta.measure_ticks(region.signature);
        let region_end = usable
            .checked_mul(measure_len)
            .and_then(|ticks| cur_time.checked_add(ticks))
            .ok_or_else(|| length_overflow(region.start_measure))?;

        if usable < config.window_measures || !region.signature.is_common_time() {
            debug!(
                start = region.start_measure,
                measures = usable,
                signature = %region.signature,
                "skipping region"
            );
            cur_time = region_end;
            continue;
        }

        let encoder = WindowEncoder {
            melody,
            config,
            measure_len,
            rate,
        };
        // fits: usable >= window_measures and usable * measure_len did not overflow
        let window_len = measure_len * config.window_measures;
        let mut start = cur_time;
        let mut measure = first_measure;
        while region_end - start >= window_len {
            let id = WindowId {
                start_measure: meta.measure_number(measure),
                end_measure: meta.measure_number(measure + config.window_measures - 1),
            };
            match encoder.encode_window(start, measure)? {
                Some(roll) => windows.push(Window { id, roll }),
                None => debug!(window = %id, "too many whole-measure rests, window dropped"),
            }
            start += measure_len;
            measure += 1;
        }
        cur_time = region_end;
    }

    Ok(windows)
}

fn length_overflow(measure: u32) -> ConvertError {
    ConvertError::Malformed {
        measure,
        message: "piece length overflows the tick counter".to_string(),
    }
}

struct WindowEncoder<'a> {
    melody: &'a [NoteEvent],
    config: &'a EncoderConfig,
    measure_len: u32,
    rate: u32,
}

impl WindowEncoder<'_> {
    /// Encode the window starting at `start`, the first tick of `measure`;
    /// `None` when its rests exceed the limit.
    fn encode_window(&self, start: u32, measure: u32) -> Result<Option<PianoRoll>> {
        let window_len = self.measure_len * self.config.window_measures;
        let end = start + window_len;
        let pitches = self.config.pitch_count();
        let time_steps = usize::try_from(u64::from(window_len) * u64::from(self.rate))
            .ok()
            .filter(|steps| steps.checked_mul(pitches).is_some())
            .ok_or_else(|| length_overflow(measure))?;
        let mut grid = vec![0u8; time_steps * pitches];

        let first = self.melody.partition_point(|n| n.start_time < start);
        if self.melody.get(first).map(|n| n.start_time) != Some(start) {
            return Err(ConvertError::NoteNotFound { tick: start });
        }

        let mut full_rests = 0;
        for note in self.melody[first..].iter().take_while(|n| n.start_time < end) {
            match note.midi_pitch(self.config.octave_convention) {
                Some(pitch) => {
                    if pitch < self.config.pitch_low || pitch >= self.config.pitch_high {
                        return Err(ConvertError::PitchOutOfRange {
                            pitch,
                            tick: note.start_time,
                            low: self.config.pitch_low,
                            high: self.config.pitch_high,
                        });
                    }
                    let column = (pitch - self.config.pitch_low) as usize;
                    let rate = u64::from(self.rate);
                    let first_row = u64::from(note.start_time - start) * rate;
                    let last_row = (first_row + u64::from(note.duration) * rate).min(time_steps as u64);
                    for row in first_row as usize..last_row as usize {
                        grid[row * pitches + column] = 1;
                    }
                }
                None => {
                    if note.duration == self.measure_len {
                        full_rests += 1;
                        if full_rests > self.config.max_full_rests {
                            return Ok(None);
                        }
                    }
                }
            }
        }

        Ok(Some(PianoRoll::from_time_major(
            &grid,
            time_steps,
            pitches,
            self.config.pitch_low,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Step, TimeSignature};

    fn meta(divisions: u32, measures: u32) -> PieceMeta {
        let mut meta = PieceMeta::new();
        meta.set_divisions(divisions).unwrap();
        meta.set_measure_count(measures).unwrap();
        meta
    }

    /// One quarter note per beat, C D E F in every measure.
    fn scale_melody(measures: u32, divisions: u32) -> Vec<NoteEvent> {
        let steps = [Step::C, Step::D, Step::E, Step::F];
        (0..measures * 4)
            .map(|i| NoteEvent::pitched(steps[(i % 4) as usize], 0, 4, divisions, i * divisions))
            .collect()
    }

    #[test]
    fn test_single_window_scenario() {
        let meta = meta(24, 4);
        let melody = scale_melody(4, 24);
        let windows = encode(&melody, &meta, &EncoderConfig::default()).unwrap();

        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        assert_eq!(window.id, WindowId { start_measure: 1, end_measure: 4 });
        assert_eq!(window.roll.grid_shape(), (384, 60));
        assert_eq!(window.roll.shape(), (60, 384));

        // Row 0 is pitch 95: nothing up there
        assert!(window.roll.row(0).iter().all(|&v| v == 0));

        // F4 (65) holds for the fourth beat of every measure
        let f4 = window.roll.row_of_pitch(65).unwrap();
        assert_eq!(f4, 95 - 65);
        let f4_row = window.roll.row(f4);
        assert!(f4_row[..72].iter().all(|&v| v == 0));
        assert!(f4_row[72..96].iter().all(|&v| v == 1));
        assert!(f4_row[96..168].iter().all(|&v| v == 0));

        let c4 = window.roll.row_of_pitch(60).unwrap();
        assert_eq!(window.roll.get(c4, 0), 1);
        assert_eq!(window.roll.get(c4, 23), 1);
        assert_eq!(window.roll.get(c4, 24), 0);

        // Every time step has exactly one sounding pitch
        assert_eq!(window.roll.active_cells(), 384);
    }

    #[test]
    fn test_window_count_per_region_length() {
        let config = EncoderConfig::default();
        for measures in 1..=9u32 {
            let windows = encode(&scale_melody(measures, 4), &meta(4, measures), &config).unwrap();
            let expected = measures.saturating_sub(3) as usize;
            assert_eq!(windows.len(), expected, "{} measures", measures);
        }
    }

    #[test]
    fn test_windows_overlap_with_one_measure_stride() {
        let windows = encode(&scale_melody(6, 4), &meta(4, 6), &EncoderConfig::default()).unwrap();
        let ids: Vec<String> = windows.iter().map(|w| w.id.to_string()).collect();
        assert_eq!(ids, vec!["1-4", "2-5", "3-6"]);
        assert_eq!(windows[1].id.file_stem("song"), "song_2-5");
    }

    fn melody_with_rest_measures(rest_measures: &[u32], measures: u32) -> Vec<NoteEvent> {
        let mut melody = Vec::new();
        for m in 0..measures {
            let start = m * 16;
            if rest_measures.contains(&(m + 1)) {
                melody.push(NoteEvent::rest(16, start));
            } else {
                melody.push(NoteEvent::pitched(Step::G, 0, 4, 8, start));
                melody.push(NoteEvent::rest(8, start + 8));
            }
        }
        melody
    }

    #[test]
    fn test_rest_limit_boundary() {
        let config = EncoderConfig::default();

        let one_rest = melody_with_rest_measures(&[2], 4);
        assert_eq!(encode(&one_rest, &meta(4, 4), &config).unwrap().len(), 1);

        let two_rests = melody_with_rest_measures(&[2, 3], 4);
        assert!(encode(&two_rests, &meta(4, 4), &config).unwrap().is_empty());

        let relaxed = EncoderConfig {
            max_full_rests: 2,
            ..EncoderConfig::default()
        };
        assert_eq!(encode(&two_rests, &meta(4, 4), &relaxed).unwrap().len(), 1);
    }

    #[test]
    fn test_rest_exclusion_is_per_window() {
        // Rests in measures 1 and 2: only the windows starting at 2 and 3 keep at most one
        let melody = melody_with_rest_measures(&[1, 2], 6);
        let windows = encode(&melody, &meta(4, 6), &EncoderConfig::default()).unwrap();
        let ids: Vec<u32> = windows.iter().map(|w| w.id.start_measure).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_non_common_time_regions_only_advance_the_clock() {
        let mut meta = meta(4, 10);
        meta.set_time(1, TimeSignature::new(3, 4)).unwrap();
        meta.set_time(5, TimeSignature::new(4, 4)).unwrap();

        let mut melody: Vec<NoteEvent> = (0..4).map(|m| NoteEvent::pitched(Step::A, 0, 4, 12, m * 12)).collect();
        melody.extend((0..6).map(|m| NoteEvent::pitched(Step::B, 0, 4, 16, 48 + m * 16)));

        let windows = encode(&melody, &meta, &EncoderConfig::default()).unwrap();
        let ids: Vec<String> = windows.iter().map(|w| w.id.to_string()).collect();
        assert_eq!(ids, vec!["5-8", "6-9", "7-10"]);
    }

    #[test]
    fn test_upbeat_shifts_windows() {
        let mut meta = meta(4, 5);
        meta.upbeat_length = 4;
        let mut melody = vec![NoteEvent::pitched(Step::G, 0, 4, 4, 0)];
        melody.extend(scale_melody(4, 4).into_iter().map(|mut n| {
            n.start_time += 4;
            n
        }));

        let windows = encode(&melody, &meta, &EncoderConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].id, WindowId { start_measure: 2, end_measure: 5 });
        let c4 = windows[0].roll.row_of_pitch(60).unwrap();
        assert_eq!(windows[0].roll.get(c4, 0), 1);
    }

    #[test]
    fn test_window_ids_follow_printed_numbers() {
        // pickup printed as measure 0, then measures 1 to 4
        let mut meta = meta(4, 5);
        meta.upbeat_length = 4;
        meta.first_number = 0;
        let mut melody = vec![NoteEvent::pitched(Step::G, 0, 4, 4, 0)];
        melody.extend(scale_melody(4, 4).into_iter().map(|mut n| {
            n.start_time += 4;
            n
        }));

        let windows = encode(&melody, &meta, &EncoderConfig::default()).unwrap();
        let ids: Vec<String> = windows.iter().map(|w| w.id.to_string()).collect();
        assert_eq!(ids, vec!["1-4"]);
    }

    #[test]
    fn test_long_note_is_clipped_to_the_window() {
        let melody = vec![NoteEvent::pitched(Step::C, 0, 4, 4_000_000_000, 0)];
        let windows = encode(&melody, &meta(4, 4), &EncoderConfig::default()).unwrap();
        let c4 = windows[0].roll.row_of_pitch(60).unwrap();
        assert!(windows[0].roll.row(c4).iter().all(|&v| v == 1));
    }

    #[test]
    fn test_piece_longer_than_the_tick_counter() {
        let result = encode(&[], &meta(4, 300_000_000), &EncoderConfig::default());
        assert!(matches!(result, Err(ConvertError::Malformed { measure: 1, .. })));
    }

    #[test]
    fn test_pitch_out_of_range_aborts() {
        let mut melody = scale_melody(4, 4);
        melody[5] = NoteEvent::pitched(Step::C, 0, 1, 4, 20);
        match encode(&melody, &meta(4, 4), &EncoderConfig::default()) {
            Err(ConvertError::PitchOutOfRange { pitch, tick, .. }) => {
                assert_eq!(pitch, 24);
                assert_eq!(tick, 20);
            }
            other => panic!("expected pitch error, got {:?}", other),
        }
    }

    #[test]
    fn test_pitch_high_is_exclusive() {
        let mut melody = scale_melody(4, 4);
        melody[0] = NoteEvent::pitched(Step::C, 0, 7, 4, 0); // 96
        assert!(encode(&melody, &meta(4, 4), &EncoderConfig::default()).is_err());
        melody[0] = NoteEvent::pitched(Step::B, 0, 6, 4, 0); // 95
        assert!(encode(&melody, &meta(4, 4), &EncoderConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_window_start_note() {
        // A half note tied across the barline into measure 2
        let mut melody = scale_melody(5, 4);
        melody[3] = NoteEvent::pitched(Step::F, 0, 4, 8, 12);
        melody.remove(4);
        match encode(&melody, &meta(4, 5), &EncoderConfig::default()) {
            Err(ConvertError::NoteNotFound { tick }) => assert_eq!(tick, 16),
            other => panic!("expected missing note, got {:?}", other),
        }
    }

    #[test]
    fn test_yamaha_convention_shifts_pitch() {
        let config = EncoderConfig {
            octave_convention: OctaveConvention::Yamaha,
            ..EncoderConfig::default()
        };
        let windows = encode(&scale_melody(4, 4), &meta(4, 4), &config).unwrap();
        let c = windows[0].roll.row_of_pitch(72).unwrap();
        assert_eq!(windows[0].roll.get(c, 0), 1);
    }

    #[test]
    fn test_incompatible_divisions() {
        let result = encode(&scale_melody(4, 5), &meta(5, 4), &EncoderConfig::default());
        assert!(matches!(
            result,
            Err(ConvertError::IncompatibleDivisions { grid_resolution: 24, divisions: 5 })
        ));
    }

    #[test]
    fn test_rate_scales_rows() {
        // divisions 4, grid 24: one tick is six rows
        let windows = encode(&scale_melody(4, 4), &meta(4, 4), &EncoderConfig::default()).unwrap();
        assert_eq!(windows[0].roll.grid_shape(), (384, 60));
        let d4 = windows[0].roll.row_of_pitch(62).unwrap();
        assert_eq!(windows[0].roll.get(d4, 23), 0);
        assert_eq!(windows[0].roll.get(d4, 24), 1);
        assert_eq!(windows[0].roll.get(d4, 47), 1);
        assert_eq!(windows[0].roll.get(d4, 48), 0);
    }

    #[test]
    fn test_config_validation() {
        let inverted = EncoderConfig {
            pitch_low: 96,
            pitch_high: 36,
            ..EncoderConfig::default()
        };
        assert!(matches!(
            encode(&[], &PieceMeta::new(), &inverted),
            Err(ConvertError::Config(_))
        ));
    }
}
