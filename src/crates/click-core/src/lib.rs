//! Core timing for click track generation
//!
//! This crate turns a score's tempo and meter structure into an exact,
//! monotonic list of timestamped clicks. It performs no I/O: scores are read
//! elsewhere and handed over through the [`ScoreSource`] trait.
//!
//! # Examples
//!
//! ```
//! use click_core::{generate, BarAnnouncer, ClickKind, TempoMap};
//!
//! // Eight beats of 4/4 at 120 BPM with a two bar count-in
//! let map = TempoMap::constant(480, 500_000);
//! let mut events = generate(&map, &[], Some(8 * 480), 2).unwrap();
//! BarAnnouncer::new(&[2]).annotate(&mut events);
//!
//! assert_eq!(events.last().unwrap().kind, ClickKind::Final);
//! assert_eq!(events.last().unwrap().timestamp_micros, 8_000_000);
//! ```
//!
//! # Main Components
//!
//! - **TempoMap**: tick to microsecond conversion over step tempo changes
//! - **MeterChange**: time signature changes
//! - **generate**: the click timeline generator
//! - **BarAnnouncer**: spoken bar number cues layered onto a timeline

pub mod announcer;
pub mod event;
pub mod fraction;
pub mod tempo;
pub mod timeline;

pub use announcer::BarAnnouncer;
pub use event::{final_timestamp, ClickEvent, ClickKind};
pub use fraction::Fraction;
pub use tempo::{
    normalize_meters, MeterChange, TempoChange, TempoMap, TimeSignature,
    DEFAULT_MICROS_PER_QUARTER,
};
pub use timeline::generate;

/// Timeline generation errors
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Score contains no notes to bound the click track")]
    NoContent,
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Tempo, meter and extent of a score, as provided by a score reader
pub trait ScoreSource {
    /// Tick resolution of the score
    fn ticks_per_quarter(&self) -> u16;

    /// Tempo changes in tick order
    fn tempo_changes(&self) -> &[TempoChange];

    /// Time signature changes in tick order
    fn meter_changes(&self) -> &[MeterChange];

    /// Tick at which the last note ends, `None` for a score without notes
    fn last_event_time(&self) -> Option<u64>;

    /// Conversion from score ticks to microseconds
    fn tempo_map(&self) -> TempoMap {
        TempoMap::new(self.ticks_per_quarter(), self.tempo_changes())
    }

    /// Generate this score's click timeline
    fn click_timeline(&self, prepare_bars: u32) -> Result<Vec<ClickEvent>> {
        generate(
            &self.tempo_map(),
            self.meter_changes(),
            self.last_event_time(),
            prepare_bars,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyScore;

    impl ScoreSource for EmptyScore {
        fn ticks_per_quarter(&self) -> u16 {
            480
        }

        fn tempo_changes(&self) -> &[TempoChange] {
            &[]
        }

        fn meter_changes(&self) -> &[MeterChange] {
            &[]
        }

        fn last_event_time(&self) -> Option<u64> {
            None
        }
    }

    #[test]
    fn test_score_without_notes_has_no_timeline() {
        assert!(matches!(
            EmptyScore.click_timeline(2),
            Err(TimelineError::NoContent)
        ));
    }
}
