//! First-fit track packing
//!
//! Clicks and voice cues overlap in time (a spoken "12" lasts longer than
//! the gap to the next click), so clips are spread over several tracks. Each
//! clip goes to the first track that is already free at its start time;
//! when none is, a new track is opened. Clips on one track never overlap.

use crate::clip::AudioClip;

/// A clip at its place on a track
#[derive(Debug)]
pub struct Placement {
    pub clip: AudioClip,
    /// Absolute start in microseconds
    pub start: u64,
    /// Silence between the previous clip's end and this clip's start
    pub gap: u64,
}

impl Placement {
    pub fn end(&self) -> u64 {
        self.start + self.clip.duration()
    }
}

/// A sequence of non-overlapping clips
#[derive(Debug)]
pub struct Track {
    placements: Vec<Placement>,
    /// Time at which the track becomes free again
    head: u64,
}

impl Track {
    fn new(clip: AudioClip, start: u64) -> Self {
        let head = start + clip.duration();
        Track {
            placements: vec![Placement {
                clip,
                start,
                gap: start,
            }],
            head,
        }
    }

    pub fn head(&self) -> u64 {
        self.head
    }

    pub fn is_free_at(&self, time: u64) -> bool {
        self.head <= time
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }

    fn push(&mut self, clip: AudioClip, start: u64) {
        debug_assert!(self.is_free_at(start));
        let gap = start - self.head;
        self.head = start + clip.duration();
        self.placements.push(Placement { clip, start, gap });
    }
}

/// Assigns clips to tracks
#[derive(Debug, Default)]
pub struct TrackPacker {
    tracks: Vec<Track>,
}

impl TrackPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack clips given as `(clip, absolute start)` pairs
    ///
    /// Clips are placed in start order; clips with equal starts keep the
    /// order they were given in.
    pub fn pack(clips: Vec<(AudioClip, u64)>) -> Vec<Track> {
        let mut clips = clips;
        clips.sort_by_key(|(_, start)| *start);

        let mut packer = TrackPacker::new();
        for (clip, start) in clips {
            packer.place(clip, start);
        }

        log::debug!("Packed clips into {} tracks", packer.tracks.len());
        packer.into_tracks()
    }

    /// Place one clip; callers must place clips in non-decreasing start order
    pub fn place(&mut self, clip: AudioClip, start: u64) {
        match self.tracks.iter_mut().find(|track| track.is_free_at(start)) {
            Some(track) => track.push(clip, start),
            None => self.tracks.push(Track::new(clip, start)),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Sample;
    use proptest::prelude::*;
    use std::sync::Arc;

    /// A silent clip lasting `millis` milliseconds
    fn clip(millis: u64) -> AudioClip {
        let frames = millis as usize;
        AudioClip::tone(Arc::new(Sample::new("silence", vec![0.0; frames], 1_000, 1)))
    }

    fn starts(track: &Track) -> Vec<u64> {
        track.placements().iter().map(|p| p.start).collect()
    }

    #[test]
    fn test_disjoint_clips_share_one_track() {
        let clips = (0..10).map(|i| (clip(100), i * 100_000)).collect();
        let tracks = TrackPacker::pack(clips);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].placements().len(), 10);
        assert!(tracks[0].placements()[1..].iter().all(|p| p.gap == 0));
        assert_eq!(tracks[0].head(), 1_000_000);
    }

    #[test]
    fn test_overlapping_clips_need_one_track_each() {
        let clips = (0..5).map(|i| (clip(100), i * 10_000)).collect();
        let tracks = TrackPacker::pack(clips);
        assert_eq!(tracks.len(), 5);
        assert!(tracks.iter().all(|t| t.placements().len() == 1));
    }

    #[test]
    fn test_first_fit_prefers_earliest_track() {
        // Two long clips, then a short one that fits after either of them
        let clips = vec![
            (clip(100), 0),
            (clip(50), 10_000),
            (clip(10), 200_000),
        ];
        let tracks = TrackPacker::pack(clips);
        assert_eq!(tracks.len(), 2);
        assert_eq!(starts(&tracks[0]), vec![0, 200_000]);
        assert_eq!(tracks[0].placements()[1].gap, 100_000);
        assert_eq!(starts(&tracks[1]), vec![10_000]);
        assert_eq!(tracks[1].placements()[0].gap, 10_000);
    }

    #[test]
    fn test_unsorted_input_with_stable_ties() {
        let clips = vec![
            (clip(30), 500_000),
            (clip(10), 0),
            (clip(20), 0),
        ];
        let tracks = TrackPacker::pack(clips);
        assert_eq!(tracks.len(), 2);
        // The 10 ms clip came first among the ties and opened track 0
        assert_eq!(tracks[0].placements()[0].clip.duration(), 10_000);
        assert_eq!(tracks[1].placements()[0].clip.duration(), 20_000);
        assert_eq!(starts(&tracks[0]), vec![0, 500_000]);
    }

    #[test]
    fn test_clip_may_start_exactly_at_head() {
        let tracks = TrackPacker::pack(vec![(clip(100), 0), (clip(100), 100_000)]);
        assert_eq!(tracks.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_no_overlap_within_a_track(
            specs in prop::collection::vec((0u64..2_000_000, 1u64..300), 1..60)
        ) {
            let clips = specs.iter().map(|&(start, millis)| (clip(millis), start)).collect();
            let tracks = TrackPacker::pack(clips);

            let placed: usize = tracks.iter().map(|t| t.placements().len()).sum();
            prop_assert_eq!(placed, specs.len());

            for track in &tracks {
                for pair in track.placements().windows(2) {
                    prop_assert!(pair[1].start >= pair[0].end());
                    prop_assert_eq!(pair[1].gap, pair[1].start - pair[0].end());
                }
                prop_assert_eq!(track.head(), track.placements().last().unwrap().end());
            }

            // Never more tracks than the largest set of mutually overlapping clips
            let max_overlap = specs
                .iter()
                .map(|&(start, _)| {
                    specs
                        .iter()
                        .filter(|&&(s, millis)| s <= start && start < s + millis * 1_000)
                        .count()
                })
                .max()
                .unwrap_or(0);
            prop_assert!(tracks.len() <= max_overlap);
        }
    }
}
