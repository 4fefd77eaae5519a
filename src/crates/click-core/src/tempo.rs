//! Tempo and meter maps
//!
//! Scores store time in ticks. A [`TempoMap`] turns a tick position into
//! wall-clock microseconds by summing every constant-tempo segment before it,
//! and [`normalize_meters`] prepares the list of time signature changes the
//! timeline walks over.

use crate::Fraction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo assumed before the first tempo change (120 BPM)
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// A step change of tempo at a tick position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Anchor position in ticks
    pub tick: u64,
    /// Length of one quarter note in microseconds
    pub micros_per_quarter: u32,
}

impl TempoChange {
    pub fn new(tick: u64, micros_per_quarter: u32) -> Self {
        TempoChange {
            tick,
            micros_per_quarter,
        }
    }

    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.micros_per_quarter as f64
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per bar
    pub numerator: u32,
    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub denominator: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    /// Length of one beat in ticks
    pub fn beat_ticks(&self, ticks_per_quarter: u16) -> Fraction {
        Fraction::new(ticks_per_quarter as i64 * 4, self.denominator as i64)
    }

    /// Length of one beat in microseconds at a fixed tempo
    pub fn beat_micros(&self, micros_per_quarter: u32) -> Fraction {
        Fraction::new(micros_per_quarter as i64 * 4, self.denominator as i64)
    }

    fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A time signature change at a tick position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterChange {
    /// Anchor position in ticks
    pub tick: u64,
    pub signature: TimeSignature,
}

impl MeterChange {
    pub fn new(tick: u64, numerator: u32, denominator: u32) -> Self {
        MeterChange {
            tick,
            signature: TimeSignature::new(numerator, denominator),
        }
    }
}

/// Sort meter changes, keep the last change per anchor and make sure a
/// change exists at tick 0 (4/4 when the score does not say otherwise).
///
/// Signatures with a zero numerator or denominator cannot be walked and are
/// dropped.
pub fn normalize_meters(changes: &[MeterChange]) -> Vec<MeterChange> {
    let mut sorted: Vec<MeterChange> = changes
        .iter()
        .copied()
        .filter(|change| {
            let valid = change.signature.is_valid();
            if !valid {
                log::warn!(
                    "Ignoring invalid time signature {} at tick {}",
                    change.signature,
                    change.tick
                );
            }
            valid
        })
        .collect();
    sorted.sort_by_key(|change| change.tick);

    let mut normalized: Vec<MeterChange> = Vec::with_capacity(sorted.len() + 1);
    for change in sorted {
        match normalized.last_mut() {
            Some(last) if last.tick == change.tick => *last = change,
            _ => normalized.push(change),
        }
    }

    if normalized.first().map_or(true, |first| first.tick != 0) {
        normalized.insert(0, MeterChange::new(0, 4, 4));
    }

    normalized
}

/// One constant-tempo stretch of the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    tick: u64,
    micros_per_quarter: u32,
    /// Elapsed time at `tick`, in units of `1 / ticks_per_quarter` microseconds
    scaled_start: u128,
}

/// Piecewise-constant mapping from ticks to microseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoMap {
    ticks_per_quarter: u16,
    segments: Vec<Segment>,
}

impl TempoMap {
    /// Create a tempo map from the changes found in a score
    ///
    /// Changes may arrive unsorted and with duplicate anchors; the last
    /// change at an anchor wins. Before the first change the default tempo
    /// of 120 BPM applies.
    pub fn new(ticks_per_quarter: u16, changes: &[TempoChange]) -> Self {
        let ticks_per_quarter = ticks_per_quarter.max(1);

        let mut sorted: Vec<TempoChange> = changes
            .iter()
            .copied()
            .filter(|change| change.micros_per_quarter > 0)
            .collect();
        sorted.sort_by_key(|change| change.tick);

        let mut normalized: Vec<TempoChange> = Vec::with_capacity(sorted.len() + 1);
        for change in sorted {
            match normalized.last_mut() {
                Some(last) if last.tick == change.tick => *last = change,
                _ => normalized.push(change),
            }
        }
        if normalized.first().map_or(true, |first| first.tick != 0) {
            normalized.insert(0, TempoChange::new(0, DEFAULT_MICROS_PER_QUARTER));
        }

        let mut segments = Vec::with_capacity(normalized.len());
        let mut scaled_start: u128 = 0;
        let mut previous: Option<TempoChange> = None;
        for change in normalized {
            if let Some(prev) = previous {
                scaled_start +=
                    (change.tick - prev.tick) as u128 * prev.micros_per_quarter as u128;
            }
            segments.push(Segment {
                tick: change.tick,
                micros_per_quarter: change.micros_per_quarter,
                scaled_start,
            });
            previous = Some(change);
        }

        TempoMap {
            ticks_per_quarter,
            segments,
        }
    }

    /// A map with a single tempo for the whole score
    pub fn constant(ticks_per_quarter: u16, micros_per_quarter: u32) -> Self {
        TempoMap::new(
            ticks_per_quarter,
            &[TempoChange::new(0, micros_per_quarter)],
        )
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    /// The tempo the score starts with
    pub fn initial_tempo(&self) -> u32 {
        self.segments[0].micros_per_quarter
    }

    /// The normalized tempo changes, always starting at tick 0
    pub fn changes(&self) -> Vec<TempoChange> {
        self.segments
            .iter()
            .map(|segment| TempoChange::new(segment.tick, segment.micros_per_quarter))
            .collect()
    }

    /// Convert a tick position to microseconds since the start of the score
    ///
    /// The result is floored to whole microseconds from an exact rational
    /// sum over every tempo segment, so the conversion is monotonic.
    /// Negative positions map to zero.
    pub fn micros_at(&self, tick: Fraction) -> u64 {
        if tick.numerator <= 0 {
            return 0;
        }

        let segment = self.segment_at(tick);
        let den = tick.denominator as u128;
        let num = tick.numerator as u128;

        // Everything below is scaled by `ticks_per_quarter * den`
        let into_segment = num - segment.tick as u128 * den;
        let scaled = segment.scaled_start * den + into_segment * segment.micros_per_quarter as u128;
        let divisor = self.ticks_per_quarter as u128 * den;

        (scaled / divisor) as u64
    }

    fn segment_at(&self, tick: Fraction) -> &Segment {
        let index = self
            .segments
            .partition_point(|segment| Fraction::from(segment.tick) <= tick);
        &self.segments[index.saturating_sub(1)]
    }
}
