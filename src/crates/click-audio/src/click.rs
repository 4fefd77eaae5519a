//! Metronome click sounds

use crate::samples::{decode_file, Sample};
use crate::Result;
use click_core::ClickKind;
use std::path::Path;
use std::sync::Arc;

/// The two sounds of a click track: accented downbeats and plain beats
#[derive(Debug, Clone)]
pub struct ClickSounds {
    pub primary: Arc<Sample>,
    pub secondary: Arc<Sample>,
}

impl ClickSounds {
    /// Short sine bursts: 1 kHz accent, 800 Hz beat
    pub fn synthesize(sample_rate: u32) -> Self {
        ClickSounds {
            primary: Arc::new(generate_click("accent", sample_rate, 1000.0, 0.015, 0.8)),
            secondary: Arc::new(generate_click("beat", sample_rate, 800.0, 0.012, 0.5)),
        }
    }

    /// Load both sounds from audio files
    pub fn load(primary: &Path, secondary: &Path) -> Result<Self> {
        Ok(ClickSounds {
            primary: Arc::new(decode_file(primary)?),
            secondary: Arc::new(decode_file(secondary)?),
        })
    }

    /// The sound to play for a click, `None` for the silent final marker
    pub fn sound_for(&self, kind: ClickKind) -> Option<&Arc<Sample>> {
        match kind {
            ClickKind::PreparePrimary | ClickKind::Primary => Some(&self.primary),
            ClickKind::PrepareSecondary | ClickKind::Secondary => Some(&self.secondary),
            ClickKind::Final => None,
        }
    }
}

/// Mono sine burst with exponential decay
fn generate_click(name: &str, sample_rate: u32, freq: f32, duration: f32, gain: f32) -> Sample {
    let num_samples = (sample_rate as f32 * duration) as usize;
    let data = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = (-t * 300.0).exp();
            (t * freq * std::f32::consts::TAU).sin() * envelope * gain
        })
        .collect();

    Sample::new(name, data, sample_rate, 1)
}
