//! Click track rendering for MIDI scores
//!
//! The batch driver ties the workspace crates together: `midi-to-click`
//! reads scores, `click-core` builds their click timelines and
//! `click-audio` turns them into audio. This crate adds configuration,
//! logging and WAV output.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod logger;

pub use batch::{Batch, BatchReport, RenderedScore, ScoreFailure};
pub use config::{BatchConfig, ClickConfig};
pub use error::{ClickError, ConfigError};
