//! Audio clips placed on the click track

use crate::cache::ReaderHandle;
use crate::samples::Sample;
use crate::{frames_to_micros, Result};
use std::sync::Arc;

/// Where a clip's audio comes from
#[derive(Debug)]
pub enum ClipSource {
    /// Decoded or synthesized audio held in memory, shared between clips
    Tone(Arc<Sample>),
    /// A voice cue read from the asset cache
    Voice(ReaderHandle),
}

impl ClipSource {
    pub fn sample_rate(&self) -> u32 {
        match self {
            ClipSource::Tone(sample) => sample.sample_rate,
            ClipSource::Voice(handle) => handle.info().sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            ClipSource::Tone(sample) => sample.channels,
            ClipSource::Voice(handle) => handle.info().channels,
        }
    }

    pub fn frames(&self) -> u64 {
        match self {
            ClipSource::Tone(sample) => sample.frames(),
            ClipSource::Voice(handle) => handle.info().frames,
        }
    }

    /// Interleaved samples at the source's own rate and channel count
    fn read_all(&mut self) -> Result<Arc<Vec<f32>>> {
        match self {
            ClipSource::Tone(sample) => Ok(Arc::clone(&sample.data)),
            ClipSource::Voice(handle) => Ok(Arc::new(handle.read_to_end()?)),
        }
    }
}

/// A clip with a fixed duration, ready to be placed on a track
#[derive(Debug)]
pub struct AudioClip {
    source: ClipSource,
    duration_micros: u64,
    gain: f32,
}

impl AudioClip {
    pub fn new(source: ClipSource) -> Self {
        let duration_micros = frames_to_micros(source.frames(), source.sample_rate());
        AudioClip {
            source,
            duration_micros,
            gain: 1.0,
        }
    }

    pub fn tone(sample: Arc<Sample>) -> Self {
        AudioClip::new(ClipSource::Tone(sample))
    }

    pub fn voice(handle: ReaderHandle) -> Self {
        AudioClip::new(ClipSource::Voice(handle))
    }

    /// Set the gain
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }

    /// Duration in microseconds
    pub fn duration(&self) -> u64 {
        self.duration_micros
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn source(&self) -> &ClipSource {
        &self.source
    }

    /// Render the clip as interleaved samples in the output format
    ///
    /// Sample rate differences are bridged by linear interpolation; mono is
    /// copied to every output channel and multi-channel sources are averaged
    /// down to mono.
    pub fn render(&mut self, sample_rate: u32, channels: u16) -> Result<Vec<f32>> {
        let source_rate = self.source.sample_rate().max(1);
        let source_channels = self.source.channels().max(1) as usize;
        let out_channels = channels.max(1) as usize;
        let data = self.source.read_all()?;
        let source_frames = data.len() / source_channels;

        let out_frames = ((source_frames as u64 * sample_rate as u64 + source_rate as u64 - 1)
            / source_rate as u64) as usize;
        let step = source_rate as f64 / sample_rate as f64;

        let mut output = Vec::with_capacity(out_frames * out_channels);
        for frame in 0..out_frames {
            let position = frame as f64 * step;
            for channel in 0..out_channels {
                let value = if out_channels == 1 && source_channels > 1 {
                    let sum: f32 = (0..source_channels)
                        .map(|c| interpolate(&data, source_channels, position, c))
                        .sum();
                    sum / source_channels as f32
                } else {
                    let source_channel = channel.min(source_channels - 1);
                    interpolate(&data, source_channels, position, source_channel)
                };
                output.push(value * self.gain);
            }
        }

        Ok(output)
    }
}

/// Sample of one channel at a fractional frame position, linearly interpolated
fn interpolate(data: &[f32], channels: usize, frame_position: f64, channel: usize) -> f32 {
    let base_index = (frame_position.floor() as usize) * channels + channel;
    if base_index >= data.len() {
        return 0.0;
    }

    let fraction = (frame_position - frame_position.floor()) as f32;
    let current = data[base_index];

    let next_index = base_index + channels;
    if next_index >= data.len() {
        return current;
    }

    let next = data[next_index];
    current + (next - current) * fraction
}
