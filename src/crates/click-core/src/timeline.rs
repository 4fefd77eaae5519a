//! Click timeline generation
//!
//! Walks a score's meter changes beat by beat and places every click on the
//! wall clock through the tempo map. A count-in at the score's opening tempo
//! and meter is prepended, and the timeline is closed by a single `Final`
//! event marking where the click track ends.

use crate::tempo::{normalize_meters, MeterChange, TempoMap};
use crate::{ClickEvent, ClickKind, Fraction, Result, TimelineError};

/// Generate the click timeline of a score
///
/// * `tempo_map` - tick to microsecond conversion for the whole score
/// * `meter_changes` - time signature changes, in any order
/// * `last_event_time` - tick at which the last note ends; `None` when the
///   score has no notes, which is rejected with [`TimelineError::NoContent`]
/// * `prepare_bars` - number of count-in bars before the first bar
pub fn generate(
    tempo_map: &TempoMap,
    meter_changes: &[MeterChange],
    last_event_time: Option<u64>,
    prepare_bars: u32,
) -> Result<Vec<ClickEvent>> {
    let last_event_time = last_event_time.ok_or(TimelineError::NoContent)?;
    let meters = normalize_meters(meter_changes);

    let mut events = Vec::new();
    let offset = count_in(tempo_map, &meters[0], prepare_bars, &mut events);

    let ticks_per_quarter = tempo_map.ticks_per_quarter();
    let end = Fraction::from(last_event_time);
    let mut cursor = Fraction::ZERO;
    let mut meter_index = 0;
    let mut signature = meters[0].signature;
    let mut remaining_beats = signature.numerator;

    while cursor < end {
        let kind = if remaining_beats == signature.numerator {
            ClickKind::Primary
        } else {
            ClickKind::Secondary
        };
        events.push(ClickEvent::new(tempo_map.micros_at(cursor) + offset, kind));

        remaining_beats -= 1;
        if remaining_beats == 0 {
            remaining_beats = signature.numerator;
        }

        cursor = cursor + signature.beat_ticks(ticks_per_quarter);

        // Several changes may have been stepped over by one long beat; the
        // last of them is the one in effect at the cursor.
        let mut activated = false;
        while meter_index + 1 < meters.len()
            && Fraction::from(meters[meter_index + 1].tick) <= cursor
        {
            meter_index += 1;
            activated = true;
        }
        if activated {
            signature = meters[meter_index].signature;
            remaining_beats = signature.numerator;
            log::debug!("Meter change to {} at tick {}", signature, cursor);
        }
    }

    events.push(ClickEvent::new(
        tempo_map.micros_at(cursor) + offset,
        ClickKind::Final,
    ));

    log::debug!(
        "Generated {} click events ({} count-in bars, {} us)",
        events.len(),
        prepare_bars,
        events.last().map_or(0, |event| event.timestamp_micros)
    );

    Ok(events)
}

/// Emit the count-in clicks and return their total length in microseconds
///
/// The count-in keeps the opening tempo and meter throughout; changes that
/// fall inside the count-in length do not affect it.
fn count_in(
    tempo_map: &TempoMap,
    first_meter: &MeterChange,
    prepare_bars: u32,
    events: &mut Vec<ClickEvent>,
) -> u64 {
    let signature = first_meter.signature;
    let beat = signature.beat_micros(tempo_map.initial_tempo());
    let total_beats = prepare_bars as i64 * signature.numerator as i64;

    for index in 0..total_beats {
        let kind = if index % signature.numerator as i64 == 0 {
            ClickKind::PreparePrimary
        } else {
            ClickKind::PrepareSecondary
        };
        let timestamp = (beat * index).floor() as u64;
        events.push(ClickEvent::new(timestamp, kind));
    }

    (beat * total_beats).floor() as u64
}
