//! Track baking and mixing

use crate::packer::Track;
use crate::{frames_to_micros, micros_to_frames, AudioError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How summed tracks are kept within full scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum MixPolicy {
    /// Scale the whole mix down when its peak exceeds `ceiling`
    Normalize { ceiling: f32 },
    /// Scale every track by `gain`; whatever still exceeds full scale is
    /// clamped and reported
    Headroom { gain: f32 },
}

impl Default for MixPolicy {
    fn default() -> Self {
        MixPolicy::Normalize { ceiling: 1.0 }
    }
}

impl MixPolicy {
    pub fn validate(&self) -> Result<()> {
        let (name, value) = match self {
            MixPolicy::Normalize { ceiling } => ("ceiling", *ceiling),
            MixPolicy::Headroom { gain } => ("gain", *gain),
        };
        if !(value > 0.0 && value <= 1.0) {
            return Err(AudioError::InvalidParams(format!(
                "Mix {} must be in (0, 1], got {}",
                name, value
            )));
        }
        Ok(())
    }
}

/// Baked audio, interleaved
#[derive(Debug, Clone, PartialEq)]
pub struct MixedBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples clamped to full scale while mixing
    pub clipped_samples: usize,
}

impl MixedBuffer {
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels.max(1) as usize) as u64
    }

    pub fn duration_micros(&self) -> u64 {
        frames_to_micros(self.frames(), self.sample_rate)
    }

    /// Pad with silence or truncate to `micros`
    pub fn fit_to_micros(&mut self, micros: u64) {
        let frames = micros_to_frames(micros, self.sample_rate) as usize;
        self.samples.resize(frames * self.channels as usize, 0.0);
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Renders packed tracks into one buffer
#[derive(Debug, Clone)]
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
    policy: MixPolicy,
}

impl Mixer {
    pub fn new(sample_rate: u32, channels: u16, policy: MixPolicy) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidParams("Sample rate must be positive".to_string()));
        }
        if !(1..=2).contains(&channels) {
            return Err(AudioError::InvalidParams(format!(
                "Only mono or stereo output is supported, got {} channels",
                channels
            )));
        }
        policy.validate()?;

        Ok(Mixer {
            sample_rate,
            channels,
            policy,
        })
    }

    /// Bake every track and sum them
    ///
    /// The result is as long as the longest track.
    pub fn bake(&self, tracks: Vec<Track>) -> Result<MixedBuffer> {
        let track_gain = match self.policy {
            MixPolicy::Headroom { gain } => gain,
            MixPolicy::Normalize { .. } => 1.0,
        };

        let track_count = tracks.len();
        let mut mix: Vec<f32> = Vec::new();
        for track in tracks {
            let signal = self.render_track(track)?;
            if signal.len() > mix.len() {
                mix.resize(signal.len(), 0.0);
            }
            for (out, sample) in mix.iter_mut().zip(&signal) {
                *out += sample * track_gain;
            }
        }

        let mut buffer = MixedBuffer {
            samples: mix,
            sample_rate: self.sample_rate,
            channels: self.channels,
            clipped_samples: 0,
        };
        self.apply_policy(&mut buffer);

        log::debug!(
            "Baked {} tracks into {:.3}s of audio",
            track_count,
            buffer.duration_micros() as f64 / 1_000_000.0
        );

        Ok(buffer)
    }

    /// One continuous signal: each clip preceded by silence up to its start
    fn render_track(&self, track: Track) -> Result<Vec<f32>> {
        let channels = self.channels as usize;
        let mut signal: Vec<f32> = Vec::new();

        for placement in track.into_placements() {
            let mut clip = placement.clip;
            let start = micros_to_frames(placement.start, self.sample_rate) as usize * channels;
            // Rounding to frames can leave the previous clip one frame past
            // this start; the clip then follows directly.
            if signal.len() < start {
                signal.resize(start, 0.0);
            }
            signal.extend(clip.render(self.sample_rate, self.channels)?);
        }

        Ok(signal)
    }

    fn apply_policy(&self, buffer: &mut MixedBuffer) {
        match self.policy {
            MixPolicy::Normalize { ceiling } => {
                let peak = buffer.peak();
                if peak > ceiling {
                    let scale = ceiling / peak;
                    for sample in buffer.samples.iter_mut() {
                        *sample *= scale;
                    }
                    log::info!("Normalized mix peak {:.3} down to {:.3}", peak, ceiling);
                }
            }
            MixPolicy::Headroom { .. } => {
                let mut clipped = 0;
                for sample in buffer.samples.iter_mut() {
                    if sample.abs() > 1.0 {
                        *sample = sample.clamp(-1.0, 1.0);
                        clipped += 1;
                    }
                }
                if clipped > 0 {
                    log::warn!(
                        "{} samples exceeded full scale and were clamped; lower the mix gain",
                        clipped
                    );
                }
                buffer.clipped_samples = clipped;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::AudioClip;
    use crate::packer::TrackPacker;
    use crate::samples::Sample;
    use std::sync::Arc;

    const RATE: u32 = 1_000;

    /// Constant-level mono clip, one frame per millisecond
    fn clip(level: f32, millis: usize) -> AudioClip {
        AudioClip::tone(Arc::new(Sample::new("dc", vec![level; millis], RATE, 1)))
    }

    #[test]
    fn test_single_track_is_silence_padded() {
        let tracks = TrackPacker::pack(vec![(clip(0.5, 2), 3_000), (clip(0.25, 1), 7_000)]);
        let mixer = Mixer::new(RATE, 1, MixPolicy::default()).unwrap();
        let buffer = mixer.bake(tracks).unwrap();

        assert_eq!(
            buffer.samples,
            vec![0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.25]
        );
        assert_eq!(buffer.duration_micros(), 8_000);
    }

    #[test]
    fn test_tracks_are_summed_to_longest() {
        let tracks = TrackPacker::pack(vec![(clip(0.25, 4), 0), (clip(0.5, 2), 1_000)]);
        assert_eq!(tracks.len(), 2);

        let mixer = Mixer::new(RATE, 1, MixPolicy::default()).unwrap();
        let buffer = mixer.bake(tracks).unwrap();
        assert_eq!(buffer.samples, vec![0.25, 0.75, 0.75, 0.25]);
    }

    #[test]
    fn test_normalize_scales_loud_mix() {
        let tracks = TrackPacker::pack(vec![(clip(0.8, 2), 0), (clip(0.8, 2), 0)]);
        let mixer = Mixer::new(RATE, 1, MixPolicy::Normalize { ceiling: 0.8 }).unwrap();
        let buffer = mixer.bake(tracks).unwrap();

        assert!((buffer.peak() - 0.8).abs() < 1e-6);
        assert_eq!(buffer.clipped_samples, 0);
    }

    #[test]
    fn test_headroom_clamps_and_counts() {
        let tracks = TrackPacker::pack(vec![
            (clip(1.0, 3), 0),
            (clip(1.0, 1), 0),
            (clip(1.0, 1), 0),
        ]);
        let mixer = Mixer::new(RATE, 1, MixPolicy::Headroom { gain: 0.5 }).unwrap();
        let buffer = mixer.bake(tracks).unwrap();

        assert_eq!(buffer.samples, vec![1.0, 0.5, 0.5]);
        assert_eq!(buffer.clipped_samples, 1);
    }

    #[test]
    fn test_stereo_output_and_fit() {
        let tracks = TrackPacker::pack(vec![(clip(0.5, 2), 1_000)]);
        let mixer = Mixer::new(RATE, 2, MixPolicy::default()).unwrap();
        let mut buffer = mixer.bake(tracks).unwrap();
        assert_eq!(buffer.samples, vec![0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);

        buffer.fit_to_micros(5_000);
        assert_eq!(buffer.frames(), 5);
        buffer.fit_to_micros(2_000);
        assert_eq!(buffer.samples, vec![0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Mixer::new(RATE, 3, MixPolicy::default()).is_err());
        assert!(Mixer::new(0, 1, MixPolicy::default()).is_err());
        assert!(Mixer::new(RATE, 1, MixPolicy::Headroom { gain: 0.0 }).is_err());
        assert!(Mixer::new(RATE, 1, MixPolicy::Normalize { ceiling: 1.5 }).is_err());
    }

    #[test]
    fn test_empty_mix() {
        let mixer = Mixer::new(RATE, 1, MixPolicy::default()).unwrap();
        let buffer = mixer.bake(Vec::new()).unwrap();
        assert!(buffer.samples.is_empty());
    }
}
