//! Per-score rendering pipeline
//!
//! Every score of a batch goes through the same steps: read the score, build
//! its click timeline, layer the spoken cues on top, pack all clips into
//! tracks, bake the mix and write it next to the score. A score that fails at
//! any step is reported and the batch moves on to the next one.

use crate::config::BatchConfig;
use crate::error::{ClickError, Result};
use crate::export;
use click_audio::{AssetCache, AudioClip, ClickSounds, MixedBuffer, Mixer, TrackPacker};
use click_core::{final_timestamp, BarAnnouncer, ClickEvent, ScoreSource};
use midi_to_click::ScoreData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A successfully rendered score
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedScore {
    pub score: PathBuf,
    pub output: PathBuf,
    pub duration_micros: u64,
    pub clicks: usize,
    pub cues: usize,
}

#[derive(Debug)]
pub struct ScoreFailure {
    pub score: PathBuf,
    pub error: ClickError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: Vec<RenderedScore>,
    pub failures: Vec<ScoreFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Batch {
    config: BatchConfig,
    sounds: ClickSounds,
}

impl Batch {
    /// Prepare a batch; loads the click sounds once for all scores
    pub fn new(config: BatchConfig) -> Result<Self> {
        let sounds = match (&config.click.primary, &config.click.secondary) {
            (Some(primary), Some(secondary)) => ClickSounds::load(primary, secondary)?,
            _ => ClickSounds::synthesize(config.sample_rate),
        };

        Ok(Batch { config, sounds })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Render every score, collecting failures instead of stopping at them
    pub fn run(&self) -> BatchReport {
        let mut report = BatchReport::default();

        for (score, important) in self.config.score_paths() {
            match self.render_score(&score, &important) {
                Ok(rendered) => {
                    log::info!(
                        "{} -> {} ({:.3}s, {} clicks, {} cues)",
                        score.display(),
                        rendered.output.display(),
                        rendered.duration_micros as f64 / 1_000_000.0,
                        rendered.clicks,
                        rendered.cues
                    );
                    report.rendered.push(rendered);
                }
                Err(error) => {
                    log::error!("{}: {}", score.display(), error);
                    report.failures.push(ScoreFailure { score, error });
                }
            }
        }

        log::info!(
            "Rendered {} of {} scores",
            report.rendered.len(),
            report.rendered.len() + report.failures.len()
        );
        report
    }

    pub fn render_score(&self, score: &Path, important: &[u32]) -> Result<RenderedScore> {
        log::info!("Processing {}", score.display());

        let data = ScoreData::from_file(score)?;
        let mut events = data.click_timeline(self.config.prepare_bars)?;
        BarAnnouncer::new(important).annotate(&mut events);
        let end = final_timestamp(&events).unwrap_or(0);

        let mut cache = AssetCache::new(&self.config.voice_dir, self.config.scratch_dir.as_deref());
        let mixed = self.mix(&events, &mut cache);
        if let Err(e) = cache.dispose() {
            log::warn!("Voice cache cleanup for {} failed: {}", score.display(), e);
        }
        let mut buffer = mixed?;

        if buffer.clipped_samples > 0 {
            log::warn!(
                "{}: {} samples clamped at full scale",
                score.display(),
                buffer.clipped_samples
            );
        }
        buffer.fit_to_micros(end);

        let output = export::output_path(score, &self.config.output_suffix);
        export::write_wav(&buffer, &output, self.config.bit_depth)?;

        Ok(RenderedScore {
            score: score.to_path_buf(),
            output,
            duration_micros: end,
            clicks: events.iter().filter(|e| self.sounds.sound_for(e.kind).is_some()).count(),
            cues: events.iter().filter(|e| e.voice_cue.is_some()).count(),
        })
    }

    /// Turn a timeline into one baked buffer
    fn mix(&self, events: &[ClickEvent], cache: &mut AssetCache) -> Result<MixedBuffer> {
        let mut clips = Vec::with_capacity(events.len());

        for event in events {
            if let Some(sound) = self.sounds.sound_for(event.kind) {
                let clip = AudioClip::tone(Arc::clone(sound)).with_gain(self.config.click.gain);
                clips.push((clip, event.timestamp_micros));
            }
            if let Some(cue) = event.voice_cue {
                let handle = cache.get_reader(cue)?;
                let clip = AudioClip::voice(handle).with_gain(self.config.voice_gain);
                clips.push((clip, event.timestamp_micros));
            }
        }

        let tracks = TrackPacker::pack(clips);
        let mixer = Mixer::new(self.config.sample_rate, self.config.channels, self.config.mix)?;
        Ok(mixer.bake(tracks)?)
    }
}
