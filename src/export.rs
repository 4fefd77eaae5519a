use crate::error::{ClickError, Result};
use click_audio::MixedBuffer;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `<dir>/<stem><suffix>.wav` next to the score
pub fn output_path(score: &Path, suffix: &str) -> PathBuf {
    let stem = score
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    score.with_file_name(format!("{}{}.wav", stem, suffix))
}

/// Encode a mixed buffer to a WAV file
///
/// The file is written under a temporary name in the target directory and
/// only renamed into place once complete.
pub fn write_wav(buffer: &MixedBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    if ![16, 24, 32].contains(&bit_depth) {
        return Err(ClickError::Audio(click_audio::AudioError::InvalidParams(
            format!("Bit depth must be 16, 24, or 32, got {}", bit_depth),
        )));
    }

    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".clickmaker-")
        .suffix(".wav.part")
        .tempfile_in(dir)?;

    {
        let mut writer = WavWriter::new(BufWriter::new(temp.as_file_mut()), spec)?;

        match bit_depth {
            16 => {
                for sample in &buffer.samples {
                    writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
                }
            }
            24 => {
                for sample in &buffer.samples {
                    writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0) as i32)?;
                }
            }
            _ => {
                for sample in &buffer.samples {
                    writer.write_sample(*sample)?;
                }
            }
        }

        writer.finalize()?;
    }

    temp.persist(path).map_err(|e| ClickError::Io(e.error))?;

    log::debug!(
        "Wrote {} ({} frames, {} channels, {} bit)",
        path.display(),
        buffer.frames(),
        buffer.channels,
        bit_depth
    );
    Ok(())
}
