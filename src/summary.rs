//! Per-piece metadata summaries, exported as YAML or as a CSV table.

use crate::error::{ConvertError, Result};
use crate::model::{NoteEvent, OctaveConvention, PieceMeta, TempoMark, TimeSignature};
use serde::Serialize;
use std::collections::BTreeMap;

/// What a batch run records about each piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PieceSummary {
    pub name: String,
    /// Printed number of the last measure, so a pickup numbered 0 is not counted.
    pub measure_count: u32,
    pub divisions: u32,
    pub time_map: BTreeMap<u32, TimeSignature>,
    pub tempo_map: BTreeMap<u32, TempoMark>,
    /// Key signature at measure 1, in fifths.
    pub key: i32,
    pub highest: Option<i32>,
    pub lowest: Option<i32>,
}

impl PieceSummary {
    pub fn new(name: &str, meta: &PieceMeta, melody: &[NoteEvent], convention: OctaveConvention) -> Self {
        let extent = pitch_extent(melody, convention);
        Self {
            name: name.to_string(),
            measure_count: meta.last_measure_number(),
            divisions: meta.divisions,
            time_map: meta.time_map().clone(),
            tempo_map: meta.tempo_map().clone(),
            key: meta.key_at(1),
            highest: extent.map(|(_, high)| high),
            lowest: extent.map(|(low, _)| low),
        }
    }
}

/// Lowest and highest MIDI pitch among the pitched notes, or `None` for a
/// melody of rests.
///
/// ```
/// use melodyroll::{pitch_extent, NoteEvent, OctaveConvention, Step};
///
/// let melody = vec![
///     NoteEvent::pitched(Step::G, 0, 3, 4, 0),
///     NoteEvent::rest(4, 4),
///     NoteEvent::pitched(Step::D, 1, 5, 4, 8),
/// ];
/// assert_eq!(pitch_extent(&melody, OctaveConvention::International), Some((55, 75)));
/// ```
pub fn pitch_extent(melody: &[NoteEvent], convention: OctaveConvention) -> Option<(i32, i32)> {
    melody
        .iter()
        .filter_map(|n| n.midi_pitch(convention))
        .fold(None, |extent, p| match extent {
            None => Some((p, p)),
            Some((low, high)) => Some((low.min(p), high.max(p))),
        })
}

/// Serialize summaries as a YAML sequence.
pub fn summaries_to_yaml(summaries: &[PieceSummary]) -> Result<String> {
    serde_yaml::to_string(summaries).map_err(|e| ConvertError::Export(e.to_string()))
}

const CSV_HEADER: [&str; 8] = [
    "name",
    "measure-count",
    "divisions",
    "time",
    "tempo",
    "key",
    "highest",
    "lowest",
];

/// Serialize summaries as a CSV table, one row per piece.
///
/// Map columns list `measure:value` pairs separated by spaces, e.g.
/// `1:4/4 5:3/4` and `1:quarter=120`. Empty extent cells mean the melody has
/// no pitched notes.
pub fn summaries_to_csv(summaries: &[PieceSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(export_error)?;
    for summary in summaries {
        let time = summary
            .time_map
            .iter()
            .map(|(measure, signature)| format!("{}:{}", measure, signature))
            .collect::<Vec<_>>()
            .join(" ");
        let tempo = summary
            .tempo_map
            .iter()
            .map(|(measure, tempo)| format!("{}:{}={}", measure, tempo.beat_unit, tempo.bpm))
            .collect::<Vec<_>>()
            .join(" ");
        let optional = |value: Option<i32>| value.map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([
                summary.name.clone(),
                summary.measure_count.to_string(),
                summary.divisions.to_string(),
                time,
                tempo,
                summary.key.to_string(),
                optional(summary.highest),
                optional(summary.lowest),
            ])
            .map_err(export_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ConvertError::Export(e.to_string()))
}

fn export_error(e: csv::Error) -> ConvertError {
    ConvertError::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Step;

    #[test]
    fn test_extent_ignores_rests() {
        let rests = vec![NoteEvent::rest(16, 0), NoteEvent::rest(16, 16)];
        assert_eq!(pitch_extent(&rests, OctaveConvention::International), None);
        assert_eq!(pitch_extent(&[], OctaveConvention::International), None);

        let melody = vec![NoteEvent::rest(4, 0), NoteEvent::pitched(Step::A, 0, 4, 4, 4)];
        assert_eq!(pitch_extent(&melody, OctaveConvention::International), Some((69, 69)));
        assert_eq!(pitch_extent(&melody, OctaveConvention::Yamaha), Some((81, 81)));
    }

    #[test]
    fn test_summary_yaml() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(8).unwrap();
        meta.set_key(1, -3).unwrap();
        meta.set_time(5, TimeSignature::new(3, 4)).unwrap();
        let melody = vec![
            NoteEvent::pitched(Step::C, 0, 4, 4, 0),
            NoteEvent::pitched(Step::E, -1, 5, 4, 4),
        ];

        let summary = PieceSummary::new("blue_moon", &meta, &melody, OctaveConvention::International);
        assert_eq!(summary.key, -3);
        assert_eq!(summary.lowest, Some(60));
        assert_eq!(summary.highest, Some(75));

        let yaml = summaries_to_yaml(&[summary]).unwrap();
        assert!(yaml.contains("name: blue_moon"));
        assert!(yaml.contains("measure-count: 8"));
        assert!(yaml.contains("beat-type: 4"));
        assert!(yaml.contains("sound-bpm: 120"));
        assert!(yaml.contains("highest: 75"));
    }

    #[test]
    fn test_summary_csv() {
        let mut meta = PieceMeta::new();
        meta.set_measure_count(5).unwrap();
        meta.first_number = 0;
        meta.upbeat_length = 4;
        meta.set_time(3, TimeSignature::new(3, 4)).unwrap();
        meta.set_tempo(1, TempoMark::new(90, "half", 180)).unwrap();
        let melody = vec![NoteEvent::pitched(Step::A, 0, 4, 4, 0)];

        let tune = PieceSummary::new("tune, with comma", &meta, &melody, OctaveConvention::International);
        assert_eq!(tune.measure_count, 4);
        let silent = PieceSummary::new("silent", &PieceMeta::new(), &[], OctaveConvention::International);

        let csv = summaries_to_csv(&[tune, silent]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,measure-count,divisions,time,tempo,key,highest,lowest");
        assert_eq!(lines[1], "\"tune, with comma\",4,4,1:4/4 3:3/4,1:half=90,0,69,69");
        assert_eq!(lines[2], "silent,1,4,1:4/4,1:quarter=120,0,,");
    }
}
