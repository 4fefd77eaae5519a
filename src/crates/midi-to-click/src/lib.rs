//! MIDI to click timeline library
//!
//! Reads tempo and time signature changes from Standard MIDI Files and
//! formats the resulting click timelines for inspection.

pub mod midi;
pub mod output;

// Re-export main types for convenience
pub use midi::{ScoreData, ScoreError};
pub use output::TimelineFormatter;
