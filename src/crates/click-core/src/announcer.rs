//! Spoken bar number cues
//!
//! Important bars are announced on their downbeat and on the downbeats of
//! the two bars leading up to them, so a performer hears "8, 9, 10" before
//! arriving at bar 10. The final count-in bar is counted aloud beat by beat.

use crate::{ClickEvent, ClickKind};
use std::collections::BTreeSet;

/// How many bars before an important bar start being announced
const LEAD_BARS: u32 = 2;

/// Attaches voice cues to a generated click timeline
#[derive(Debug, Clone, Default)]
pub struct BarAnnouncer {
    marked: BTreeSet<u32>,
}

impl BarAnnouncer {
    /// Create an announcer for the given important bars (1-based)
    pub fn new(important_bars: &[u32]) -> Self {
        let mut marked = BTreeSet::new();
        for &bar in important_bars {
            for lead in 0..=LEAD_BARS {
                if let Some(announced) = bar.checked_sub(lead).filter(|&b| b >= 1) {
                    marked.insert(announced);
                }
            }
        }
        BarAnnouncer { marked }
    }

    /// Bars whose downbeat will carry a cue
    pub fn marked_bars(&self) -> impl Iterator<Item = u32> + '_ {
        self.marked.iter().copied()
    }

    /// Attach cues to `events` in place
    pub fn annotate(&self, events: &mut [ClickEvent]) {
        self.count_last_prepare_bar(events);

        let mut bar = 0u32;
        for event in events.iter_mut() {
            if event.kind == ClickKind::Primary {
                bar += 1;
                if self.marked.contains(&bar) {
                    event.voice_cue = Some(bar);
                }
            }
        }
    }

    /// Count the beats of the last count-in bar: 1, 2, 3, ...
    ///
    /// Only the final repetition of the count-in is spoken; earlier count-in
    /// bars stay silent apart from their clicks.
    fn count_last_prepare_bar(&self, events: &mut [ClickEvent]) {
        let Some(start) = events
            .iter()
            .rposition(|event| event.kind == ClickKind::PreparePrimary)
        else {
            return;
        };

        let mut count = 1;
        for event in events[start..].iter_mut() {
            if !event.kind.is_prepare() {
                break;
            }
            event.voice_cue = Some(count);
            count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::generate;
    use crate::tempo::{MeterChange, TempoMap};

    fn timeline(bars: u64, prepare_bars: u32) -> Vec<ClickEvent> {
        let map = TempoMap::constant(480, 500_000);
        generate(&map, &[], Some(bars * 4 * 480), prepare_bars).unwrap()
    }

    #[test]
    fn test_important_bar_announces_two_bars_ahead() {
        let mut events = timeline(12, 0);
        BarAnnouncer::new(&[10]).annotate(&mut events);

        let cued: Vec<_> = events
            .iter()
            .filter_map(|event| event.voice_cue.map(|cue| (event.kind, cue)))
            .collect();
        assert_eq!(
            cued,
            vec![
                (ClickKind::Primary, 8),
                (ClickKind::Primary, 9),
                (ClickKind::Primary, 10),
            ]
        );
    }

    #[test]
    fn test_early_bars_do_not_underflow() {
        let announcer = BarAnnouncer::new(&[1, 2]);
        assert_eq!(announcer.marked_bars().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_only_last_count_in_bar_is_counted() {
        let mut events = timeline(1, 3);
        BarAnnouncer::new(&[]).annotate(&mut events);

        let prepare: Vec<_> = events.iter().filter(|e| e.kind.is_prepare()).collect();
        assert_eq!(prepare.len(), 12);
        assert!(prepare[..8].iter().all(|e| e.voice_cue.is_none()));
        let counts: Vec<_> = prepare[8..].iter().map(|e| e.voice_cue).collect();
        assert_eq!(counts, vec![Some(1), Some(2), Some(3), Some(4)]);

        // Main section and final stay silent
        assert!(events
            .iter()
            .filter(|e| !e.kind.is_prepare())
            .all(|e| e.voice_cue.is_none()));
    }

    #[test]
    fn test_count_in_follows_opening_meter() {
        let map = TempoMap::constant(480, 500_000);
        let mut events = generate(&map, &[MeterChange::new(0, 3, 4)], Some(480), 1).unwrap();
        BarAnnouncer::new(&[1]).annotate(&mut events);

        let cues: Vec<_> = events.iter().map(|e| e.voice_cue).collect();
        assert_eq!(cues, vec![Some(1), Some(2), Some(3), Some(1), None]);
    }

    #[test]
    fn test_without_count_in_nothing_is_counted() {
        let mut events = timeline(2, 0);
        BarAnnouncer::new(&[]).annotate(&mut events);
        assert!(events.iter().all(|e| e.voice_cue.is_none()));
    }
}
