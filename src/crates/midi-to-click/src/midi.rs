use click_core::{MeterChange, ScoreSource, TempoChange};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("Failed to read MIDI file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse MIDI file: {0}")]
    Parse(String),
}

/// Tempo, meter and extent of a Standard MIDI File
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreData {
    pub ticks_per_quarter: u16,
    pub tempo_changes: Vec<TempoChange>,
    pub meter_changes: Vec<MeterChange>,
    /// Tick at which the last note ends
    pub last_note_end: Option<u64>,
    pub note_count: usize,
}

impl ScoreData {
    pub fn from_file(path: &Path) -> Result<Self, ScoreError> {
        let data = std::fs::read(path).map_err(|source| ScoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ScoreError> {
        let smf = Smf::parse(data).map_err(|e| ScoreError::Parse(e.to_string()))?;

        let (ticks_per_quarter, timecode) = match smf.header.timing {
            Timing::Metrical(tpb) => (tpb.as_int(), false),
            Timing::Timecode(fps, subframe) => {
                // Ticks are a fixed fraction of a second: treat one second as
                // a quarter note at 60 BPM so ticks convert directly.
                (fps.as_int() as u16 * subframe as u16, true)
            }
        };

        let mut tempo_changes = Vec::new();
        let mut meter_changes = Vec::new();
        let mut last_note_end: Option<u64> = None;
        let mut note_count = 0;

        for track in &smf.tracks {
            let mut tick: u64 = 0;
            // Start ticks of sounding notes per (channel, key)
            let mut sounding: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

            for event in track {
                tick += event.delta.as_int() as u64;

                match event.kind {
                    TrackEventKind::Meta(MetaMessage::Tempo(tempo)) if !timecode => {
                        tempo_changes.push(TempoChange::new(tick, tempo.as_int()));
                    }
                    TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, power, _, _)) => {
                        match 1u32.checked_shl(power as u32) {
                            Some(denominator) if power < 16 => {
                                meter_changes.push(MeterChange::new(
                                    tick,
                                    numerator as u32,
                                    denominator,
                                ));
                            }
                            _ => log::warn!(
                                "Ignoring time signature with denominator 2^{} at tick {}",
                                power,
                                tick
                            ),
                        }
                    }
                    TrackEventKind::Midi { channel, message } => match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            sounding
                                .entry((channel.as_int(), key.as_int()))
                                .or_default()
                                .push(tick);
                            note_count += 1;
                        }
                        // Note-on with velocity 0 is a note-off
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let released = sounding
                                .get_mut(&(channel.as_int(), key.as_int()))
                                .and_then(|starts| starts.pop());
                            if released.is_some() {
                                last_note_end = last_note_end.max(Some(tick));
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }

            // Notes never released end with their track
            if sounding.values().any(|starts| !starts.is_empty()) {
                last_note_end = last_note_end.max(Some(tick));
            }
        }

        if timecode {
            tempo_changes = vec![TempoChange::new(0, 1_000_000)];
        }
        tempo_changes.sort_by_key(|change| change.tick);
        meter_changes.sort_by_key(|change| change.tick);

        log::debug!(
            "Read MIDI score: {} notes, {} tempo changes, {} meter changes, {} ticks per quarter",
            note_count,
            tempo_changes.len(),
            meter_changes.len(),
            ticks_per_quarter
        );

        Ok(ScoreData {
            ticks_per_quarter,
            tempo_changes,
            meter_changes,
            last_note_end: if note_count > 0 { last_note_end } else { None },
            note_count,
        })
    }
}

impl ScoreSource for ScoreData {
    fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    fn tempo_changes(&self) -> &[TempoChange] {
        &self.tempo_changes
    }

    fn meter_changes(&self) -> &[MeterChange] {
        &self.meter_changes
    }

    fn last_event_time(&self) -> Option<u64> {
        self.last_note_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use click_core::{ClickKind, TimelineError};
    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Format, Header, TrackEvent};

    fn event(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind,
        }
    }

    fn note(on: bool, key: u8) -> TrackEventKind<'static> {
        let key = u7::new(key);
        let message = if on {
            MidiMessage::NoteOn { key, vel: u7::new(100) }
        } else {
            MidiMessage::NoteOff { key, vel: u7::new(0) }
        };
        TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        }
    }

    fn encode(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(480)),
        ));
        smf.tracks = tracks;
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_reads_tempo_meter_and_note_end() {
        let conductor = vec![
            event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(600_000)))),
            event(0, TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, 24, 8))),
            event(1440, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(400_000)))),
            event(0, TrackEventKind::Meta(MetaMessage::TimeSignature(6, 3, 24, 8))),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let melody = vec![
            event(0, note(true, 60)),
            event(960, note(false, 60)),
            event(960, note(true, 64)),
            event(480, note(false, 64)),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];

        let score = ScoreData::from_bytes(&encode(vec![conductor, melody])).unwrap();
        assert_eq!(score.ticks_per_quarter, 480);
        assert_eq!(
            score.tempo_changes,
            vec![TempoChange::new(0, 600_000), TempoChange::new(1440, 400_000)]
        );
        assert_eq!(
            score.meter_changes,
            vec![MeterChange::new(0, 3, 4), MeterChange::new(1440, 6, 8)]
        );
        assert_eq!(score.note_count, 2);
        assert_eq!(score.last_event_time(), Some(2400));
    }

    #[test]
    fn test_velocity_zero_releases_note() {
        let track = vec![
            event(0, note(true, 60)),
            event(
                720,
                TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn {
                        key: u7::new(60),
                        vel: u7::new(0),
                    },
                },
            ),
            event(1000, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let score = ScoreData::from_bytes(&encode(vec![track])).unwrap();
        assert_eq!(score.last_event_time(), Some(720));
    }

    #[test]
    fn test_unreleased_note_ends_with_track() {
        let track = vec![
            event(0, note(true, 60)),
            event(1920, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let score = ScoreData::from_bytes(&encode(vec![track])).unwrap();
        assert_eq!(score.last_event_time(), Some(1920));
    }

    #[test]
    fn test_score_without_notes_cannot_make_a_timeline() {
        let track = vec![
            event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))),
            event(960, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let score = ScoreData::from_bytes(&encode(vec![track])).unwrap();
        assert_eq!(score.last_event_time(), None);
        assert!(matches!(
            score.click_timeline(2),
            Err(TimelineError::NoContent)
        ));
    }

    #[test]
    fn test_timeline_from_midi() {
        let track = vec![
            event(0, note(true, 60)),
            event(8 * 480, note(false, 60)),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let score = ScoreData::from_bytes(&encode(vec![track])).unwrap();
        let events = score.click_timeline(1).unwrap();

        let primaries = events.iter().filter(|e| e.kind == ClickKind::Primary).count();
        assert_eq!(primaries, 2);
        assert_eq!(events.last().unwrap().timestamp_micros, 6_000_000);
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(matches!(
            ScoreData::from_bytes(b"not a midi file"),
            Err(ScoreError::Parse(_))
        ));
        assert!(matches!(
            ScoreData::from_file(Path::new("/no/such/score.mid")),
            Err(ScoreError::Read { .. })
        ));
    }
}
