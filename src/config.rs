//! # Configuration
//!
//! Settings are read from YAML with kebab-case keys. Every key is optional;
//! anything left out keeps its default.
//!
//! ```yaml
//! grid-resolution: 24
//! pitch-low: 36
//! pitch-high: 96
//! window-measures: 4
//! max-full-rests: 1
//! octave-convention: international   # or yamaha
//! software: melodyroll
//! encoding-date: 2024-01-01
//! part-name: Piano
//! part-abbreviation: Pno.
//! ```

use crate::error::{ConvertError, Result};
use crate::model::OctaveConvention;
use crate::musicxml::SynthConfig;
use crate::segment::EncoderConfig;
use serde::Deserialize;
use std::path::Path;

/// Settings as written in a config file, before defaults and validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub grid_resolution: Option<u32>,
    pub pitch_low: Option<i32>,
    pub pitch_high: Option<i32>,
    pub window_measures: Option<u32>,
    pub max_full_rests: Option<u32>,
    pub octave_convention: Option<OctaveConvention>,
    pub rights: Option<String>,
    pub software: Option<String>,
    pub encoding_date: Option<String>,
    pub part_name: Option<String>,
    pub part_abbreviation: Option<String>,
    pub midi_program: Option<u32>,
}

/// Validated settings for both directions of conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub synth: SynthConfig,
}

impl Config {
    /// Parse and validate a YAML document.
    ///
    /// ```rust
    /// use melodyroll::Config;
    ///
    /// let config = Config::from_yaml_str("grid-resolution: 48\noctave-convention: yamaha\n")?;
    /// assert_eq!(config.encoder.grid_resolution, 48);
    /// assert_eq!(config.encoder.pitch_low, 36);
    /// # Ok::<(), melodyroll::ConvertError>(())
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConvertError::Config(e.to_string()))?;
        raw.into_config()
    }

    /// Read a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}

impl RawConfig {
    /// Fill in defaults and check the encoder settings.
    pub fn into_config(self) -> Result<Config> {
        let defaults = EncoderConfig::default();
        let encoder = EncoderConfig {
            grid_resolution: self.grid_resolution.unwrap_or(defaults.grid_resolution),
            pitch_low: self.pitch_low.unwrap_or(defaults.pitch_low),
            pitch_high: self.pitch_high.unwrap_or(defaults.pitch_high),
            window_measures: self.window_measures.unwrap_or(defaults.window_measures),
            max_full_rests: self.max_full_rests.unwrap_or(defaults.max_full_rests),
            octave_convention: self.octave_convention.unwrap_or(defaults.octave_convention),
        };
        encoder.validate()?;

        if let Some(date) = &self.encoding_date {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                ConvertError::Config(format!("encoding-date '{}' is not YYYY-MM-DD", date))
            })?;
        }

        let mut synth = SynthConfig::default();
        if let Some(rights) = self.rights {
            synth.rights = rights;
        }
        if let Some(software) = self.software {
            synth.software = software;
        }
        synth.encoding_date = self.encoding_date;
        if let Some(name) = self.part_name {
            synth.part_name = name;
        }
        if let Some(abbreviation) = self.part_abbreviation {
            synth.part_abbreviation = abbreviation;
        }
        if let Some(program) = self.midi_program {
            synth.midi_program = program;
        }

        Ok(Config { encoder, synth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
grid-resolution: 12
pitch-low: 48
pitch-high: 84
window-measures: 8
max-full-rests: 0
octave-convention: yamaha
software: roll-tool
encoding-date: "2023-05-17"
part-name: Violin
part-abbreviation: Vln.
midi-program: 41
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.encoder.grid_resolution, 12);
        assert_eq!(config.encoder.pitch_count(), 36);
        assert_eq!(config.encoder.window_measures, 8);
        assert_eq!(config.encoder.max_full_rests, 0);
        assert_eq!(config.encoder.octave_convention, OctaveConvention::Yamaha);
        assert_eq!(config.synth.software, "roll-tool");
        assert_eq!(config.synth.encoding_date.as_deref(), Some("2023-05-17"));
        assert_eq!(config.synth.part_name, "Violin");
        assert_eq!(config.synth.midi_program, 41);
        assert_eq!(config.synth.rights, "----");
    }

    #[test]
    fn test_invalid_values() {
        let inverted = Config::from_yaml_str("pitch-low: 90\npitch-high: 40\n");
        assert!(matches!(inverted, Err(ConvertError::Config(_))));

        assert!(Config::from_yaml_str("grid-resolution: 0\n").is_err());
        assert!(Config::from_yaml_str("window-measures: 0\n").is_err());
        assert!(Config::from_yaml_str("octave-convention: german\n").is_err());
        assert!(Config::from_yaml_str("encoding-date: yesterday\n").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_yaml_str("grid-resolutoin: 24\n").unwrap_err();
        assert!(err.to_string().contains("grid-resolutoin"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grid-resolution: 48").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.encoder.grid_resolution, 48);

        let missing = Config::load(Path::new("/nonexistent/melodyroll.yaml"));
        assert!(matches!(missing, Err(ConvertError::Config(_))));
    }
}
