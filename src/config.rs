//! Batch configuration
//!
//! A batch is described by one JSON file listing the scores to render and the
//! output settings shared by all of them. Relative paths inside the file are
//! resolved against the file's own directory.

use crate::error::ConfigError;
use click_audio::MixPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "clickmaker.json";
pub const SCHEMA_FILE: &str = "clickmaker.schema.json";

const SAMPLE_RATES: [u32; 4] = [22050, 44100, 48000, 96000];
const BIT_DEPTHS: [u16; 3] = [16, 24, 32];

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Score files mapped to the bar numbers to announce
    pub scores: BTreeMap<String, Vec<u32>>,

    /// Count-in bars before the first bar of the score
    #[serde(default = "default_prepare_bars")]
    pub prepare_bars: u32,

    /// Directory holding `<n>.<ext>` voice recordings
    #[serde(default = "default_voice_dir")]
    pub voice_dir: PathBuf,

    /// Appended to the score's file stem to name the output
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// 16 or 24 bit integer, or 32 bit float
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u16,

    #[serde(default)]
    pub mix: MixPolicy,

    #[serde(default)]
    pub click: ClickConfig,

    #[serde(default = "default_gain")]
    pub voice_gain: f32,

    /// Parent directory for decoded voice scratch files (default: system temp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    #[serde(skip)]
    base_dir: PathBuf,
}

/// Click sounds; synthesized unless both files are given
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<PathBuf>,

    #[serde(default = "default_gain")]
    pub gain: f32,
}

impl Default for ClickConfig {
    fn default() -> Self {
        ClickConfig {
            primary: None,
            secondary: None,
            gain: default_gain(),
        }
    }
}

fn default_prepare_bars() -> u32 {
    2
}

fn default_voice_dir() -> PathBuf {
    PathBuf::from("voices")
}

fn default_output_suffix() -> String {
    "_click".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    1
}

fn default_bit_depth() -> u16 {
    16
}

fn default_gain() -> f32 {
    1.0
}

impl BatchConfig {
    /// Defaults for everything, with the given scores
    pub fn new(scores: BTreeMap<String, Vec<u32>>) -> Self {
        BatchConfig {
            schema: None,
            scores,
            prepare_bars: default_prepare_bars(),
            voice_dir: default_voice_dir(),
            output_suffix: default_output_suffix(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bit_depth: default_bit_depth(),
            mix: MixPolicy::default(),
            click: ClickConfig::default(),
            voice_gain: default_gain(),
            scratch_dir: None,
            base_dir: PathBuf::new(),
        }
    }

    /// Read, resolve and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BatchConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        config.resolve_paths(&base_dir);
        config.validate()?;

        log::debug!(
            "Loaded configuration {} with {} scores",
            path.display(),
            config.scores.len()
        );
        Ok(config)
    }

    /// Make every relative path relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        self.voice_dir = base_dir.join(&self.voice_dir);
        self.scratch_dir = self.scratch_dir.as_ref().map(|dir| base_dir.join(dir));
        self.click.primary = self.click.primary.as_ref().map(|p| base_dir.join(p));
        self.click.secondary = self.click.secondary.as_ref().map(|p| base_dir.join(p));
        self.base_dir = base_dir.to_path_buf();
    }

    /// Score paths with their important bars, in path order
    pub fn score_paths(&self) -> Vec<(PathBuf, Vec<u32>)> {
        self.scores
            .iter()
            .map(|(score, bars)| (self.base_dir.join(score), bars.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scores.is_empty() {
            return Err(ConfigError::Invalid("No scores listed".to_string()));
        }

        if !SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ConfigError::Invalid(format!(
                "Sample rate must be 22050, 44100, 48000, or 96000 Hz, got {}",
                self.sample_rate
            )));
        }

        if !(1..=2).contains(&self.channels) {
            return Err(ConfigError::Invalid(format!(
                "Channels must be 1 or 2, got {}",
                self.channels
            )));
        }

        if !BIT_DEPTHS.contains(&self.bit_depth) {
            return Err(ConfigError::Invalid(format!(
                "Bit depth must be 16, 24, or 32, got {}",
                self.bit_depth
            )));
        }

        self.mix
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for (name, gain) in [("Click gain", self.click.gain), ("Voice gain", self.voice_gain)] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, gain
                )));
            }
        }

        if self.click.primary.is_some() != self.click.secondary.is_some() {
            return Err(ConfigError::Invalid(
                "Click sounds need both a primary and a secondary file, or neither".to_string(),
            ));
        }

        Ok(())
    }

    /// Write a starter configuration to `path` and its JSON Schema next to it
    ///
    /// Returns the path of the schema file.
    pub fn write_template(path: &Path) -> Result<PathBuf, ConfigError> {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
        let schema_path = dir.join(SCHEMA_FILE);

        let mut scores = BTreeMap::new();
        scores.insert("score.mid".to_string(), vec![9, 17]);
        let mut template = BatchConfig::new(scores);
        template.schema = Some(format!("./{}", SCHEMA_FILE));

        let schema = schemars::schema_for!(BatchConfig);
        fs::write(&schema_path, to_json(&schema)?)?;
        fs::write(path, to_json(&template)?)?;

        log::info!(
            "Wrote configuration template {} and schema {}",
            path.display(),
            schema_path.display()
        );
        Ok(schema_path)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|e| ConfigError::Invalid(format!("Failed to serialize JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_defaults_and_path_resolution() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), r#"{ "scores": { "songs/a.mid": [9, 17] } }"#);

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.prepare_bars, 2);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bit_depth, 16);
        assert_eq!(config.output_suffix, "_click");
        assert_eq!(config.mix, MixPolicy::Normalize { ceiling: 1.0 });
        assert_eq!(config.voice_dir, dir.path().join("voices"));
        assert_eq!(
            config.score_paths(),
            vec![(dir.path().join("songs/a.mid"), vec![9, 17])]
        );
    }

    #[test]
    fn test_full_configuration() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            r#"{
                "scores": { "a.mid": [] },
                "prepareBars": 1,
                "voiceDir": "/opt/voices",
                "sampleRate": 48000,
                "channels": 2,
                "bitDepth": 24,
                "mix": { "mode": "headroom", "gain": 0.5 },
                "click": { "primary": "hi.wav", "secondary": "lo.wav", "gain": 0.8 },
                "voiceGain": 0.7,
                "scratchDir": "tmp"
            }"#,
        );

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.prepare_bars, 1);
        assert_eq!(config.voice_dir, PathBuf::from("/opt/voices"));
        assert_eq!(config.mix, MixPolicy::Headroom { gain: 0.5 });
        assert_eq!(config.click.primary, Some(dir.path().join("hi.wav")));
        assert_eq!(config.scratch_dir, Some(dir.path().join("tmp")));
        assert_eq!(config.voice_gain, 0.7);
    }

    #[test]
    fn test_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            BatchConfig::load(&dir.path().join("nope.json")),
            Err(ConfigError::Missing(_))
        ));

        let path = write(dir.path(), "{ not json");
        assert!(matches!(
            BatchConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));

        let path = write(dir.path(), r#"{ "prepareBars": 2 }"#);
        assert!(matches!(
            BatchConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let mut scores = BTreeMap::new();
        scores.insert("a.mid".to_string(), vec![]);
        let valid = BatchConfig::new(scores);
        assert!(valid.validate().is_ok());

        let cases: Vec<Box<dyn Fn(&mut BatchConfig)>> = vec![
            Box::new(|c| c.sample_rate = 8000),
            Box::new(|c| c.channels = 6),
            Box::new(|c| c.bit_depth = 8),
            Box::new(|c| c.mix = MixPolicy::Normalize { ceiling: 0.0 }),
            Box::new(|c| c.voice_gain = -1.0),
            Box::new(|c| c.click.primary = Some(PathBuf::from("hi.wav"))),
            Box::new(|c| c.scores.clear()),
        ];
        for change in cases {
            let mut config = valid.clone();
            change(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_template_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let schema_path = BatchConfig::write_template(&path).unwrap();
        assert_eq!(schema_path, dir.path().join(SCHEMA_FILE));

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.scores.get("score.mid"), Some(&vec![9, 17]));
        assert_eq!(config.schema.as_deref(), Some("./clickmaker.schema.json"));

        let schema: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&schema_path).unwrap()).unwrap();
        assert!(schema["properties"]["prepareBars"].is_object());
        assert!(schema["properties"]["mix"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["scores"]));
    }
}
