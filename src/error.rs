use click_audio::AudioError;
use click_core::TimelineError;
use midi_to_click::ScoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ClickError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClickError {
    /// Stable name of the error kind, as printed in batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            ClickError::Config(e) => match e {
                ConfigError::Missing(_) => "ConfigMissing",
                ConfigError::Read { .. } => "ConfigRead",
                ConfigError::Parse { .. } => "ConfigParse",
                ConfigError::Invalid(_) => "ConfigInvalid",
                ConfigError::Io(_) => "Io",
            },
            ClickError::Score(e) => match e {
                ScoreError::Read { .. } => "ScoreRead",
                ScoreError::Parse(_) => "ScoreParse",
            },
            ClickError::Timeline(TimelineError::NoContent) => "NoContent",
            ClickError::Audio(e) => match e {
                AudioError::InvalidKey(_) => "InvalidKey",
                AudioError::MissingAsset(_) => "MissingAsset",
                AudioError::AssetDecodeFailure { .. } => "AssetDecodeFailure",
                AudioError::HandleClosed(_) => "HandleClosed",
                AudioError::InvalidParams(_) => "InvalidParams",
                AudioError::Wav(_) => "Wav",
                AudioError::Io(_) => "Io",
            },
            ClickError::Io(_) => "Io",
            ClickError::Wav(_) => "Wav",
            ClickError::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClickError>;
