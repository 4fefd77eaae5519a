//! Audio side of click track generation
//!
//! This crate turns a click timeline into sound:
//! - Decode click and voice samples with Symphonia
//! - Cache decoded voice cues as scratch WAV files with independent readers
//! - Pack timestamped clips into non-overlapping tracks (first fit)
//! - Bake the tracks into one mixed buffer under an explicit gain policy

pub mod cache;
pub mod click;
pub mod clip;
pub mod mixer;
pub mod packer;
pub mod samples;

use std::path::PathBuf;

pub use cache::{AssetCache, AssetInfo, ReaderHandle, MAX_KEY, MIN_KEY};
pub use click::ClickSounds;
pub use clip::{AudioClip, ClipSource};
pub use mixer::{MixPolicy, MixedBuffer, Mixer};
pub use packer::{Placement, Track, TrackPacker};
pub use samples::{decode_file, Sample};

/// Audio errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Voice cue {0} is outside the supported range 1-9999")]
    InvalidKey(u32),

    #[error("Audio asset not found: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Failed to decode {}: {reason}", .path.display())]
    AssetDecodeFailure { path: PathBuf, reason: String },

    #[error("Reader for voice cue {0} was used after the cache was disposed")]
    HandleClosed(u32),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Length of `frames` at `sample_rate`, rounded up to whole microseconds
pub fn frames_to_micros(frames: u64, sample_rate: u32) -> u64 {
    let rate = sample_rate.max(1) as u128;
    ((frames as u128 * 1_000_000 + rate - 1) / rate) as u64
}

/// Frame index at which `micros` falls, rounded down
pub fn micros_to_frames(micros: u64, sample_rate: u32) -> u64 {
    (micros as u128 * sample_rate as u128 / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_conversions() {
        assert_eq!(frames_to_micros(44_100, 44_100), 1_000_000);
        assert_eq!(frames_to_micros(1, 44_100), 23);
        assert_eq!(micros_to_frames(500_000, 48_000), 24_000);
        assert_eq!(micros_to_frames(22, 44_100), 0);
    }
}
