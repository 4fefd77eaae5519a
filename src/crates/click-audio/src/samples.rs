//! Sample decoding
//!
//! Decodes whole audio files into interleaved `f32` PCM with Symphonia.
//! Used for click sounds and for the first request of every voice cue.

use crate::{frames_to_micros, AudioError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// An audio sample with decoded PCM data
#[derive(Debug, Clone)]
pub struct Sample {
    /// Sample name, usually the file it came from
    pub name: String,
    /// Audio data (interleaved f32, normalized to [-1.0, 1.0])
    pub data: Arc<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Sample {
    pub fn new(name: impl Into<String>, data: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Sample {
            name: name.into(),
            data: Arc::new(data),
            sample_rate,
            channels,
        }
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> u64 {
        (self.data.len() / self.channels.max(1) as usize) as u64
    }

    /// Get the duration of this sample in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Duration rounded up to whole microseconds
    pub fn duration_micros(&self) -> u64 {
        frames_to_micros(self.frames(), self.sample_rate)
    }
}

fn decode_failure(path: &Path, reason: impl Into<String>) -> AudioError {
    AudioError::AssetDecodeFailure {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Decode an audio file completely
///
/// Fails with [`AudioError::MissingAsset`] when the file does not exist and
/// [`AudioError::AssetDecodeFailure`] when no audio can be decoded from it.
pub fn decode_file(path: &Path) -> Result<Sample> {
    if !path.is_file() {
        return Err(AudioError::MissingAsset(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_failure(path, format!("failed to probe format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_failure(path, "no audio track found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_failure(path, format!("failed to create decoder: {}", e)))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    let mut data: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_failure(path, format!("format error: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                data.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet only costs its own samples
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(decode_failure(path, format!("decoder error: {}", e))),
        }
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(decode_failure(path, "unknown sample rate or channel layout"));
    };
    if data.is_empty() {
        return Err(decode_failure(path, "no audio decoded"));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::debug!(
        "Decoded {} ({} Hz, {} ch, {:.3}s)",
        name,
        sample_rate,
        channels,
        data.len() as f64 / (sample_rate as f64 * channels.max(1) as f64)
    );

    Ok(Sample::new(name, data, sample_rate, channels))
}
