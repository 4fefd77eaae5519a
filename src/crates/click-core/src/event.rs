use serde::{Deserialize, Serialize};
use std::fmt;

/// What a click marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickKind {
    /// Downbeat of a count-in bar
    PreparePrimary,
    /// Other beats of a count-in bar
    PrepareSecondary,
    /// Downbeat of a bar
    Primary,
    /// Other beats of a bar
    Secondary,
    /// End of the timeline; carries no sound
    Final,
}

impl ClickKind {
    pub fn is_prepare(&self) -> bool {
        matches!(self, ClickKind::PreparePrimary | ClickKind::PrepareSecondary)
    }

    /// Downbeats, counted-in or not
    pub fn is_accent(&self) -> bool {
        matches!(self, ClickKind::PreparePrimary | ClickKind::Primary)
    }
}

impl fmt::Display for ClickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClickKind::PreparePrimary => "prepare-primary",
            ClickKind::PrepareSecondary => "prepare-secondary",
            ClickKind::Primary => "primary",
            ClickKind::Secondary => "secondary",
            ClickKind::Final => "final",
        };
        f.write_str(name)
    }
}

/// A timestamped click, optionally announced by a spoken number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Wall-clock position in microseconds, count-in included
    pub timestamp_micros: u64,
    pub kind: ClickKind,
    /// Bar number or count-in beat to speak at this click
    pub voice_cue: Option<u32>,
}

impl ClickEvent {
    pub fn new(timestamp_micros: u64, kind: ClickKind) -> Self {
        ClickEvent {
            timestamp_micros,
            kind,
            voice_cue: None,
        }
    }

    pub fn with_cue(mut self, cue: u32) -> Self {
        self.voice_cue = Some(cue);
        self
    }

    pub fn seconds(&self) -> f64 {
        self.timestamp_micros as f64 / 1_000_000.0
    }
}

/// Timestamp of the closing `Final` event, if the timeline has one
pub fn final_timestamp(events: &[ClickEvent]) -> Option<u64> {
    events
        .last()
        .filter(|event| event.kind == ClickKind::Final)
        .map(|event| event.timestamp_micros)
}
