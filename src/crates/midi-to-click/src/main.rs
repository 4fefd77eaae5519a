use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use click_core::{normalize_meters, BarAnnouncer, ScoreSource, TempoChange};
use midi_to_click::{ScoreData, TimelineFormatter};

#[derive(Parser, Debug)]
#[command(name = "midi-to-click")]
#[command(about = "Print the click timeline of a MIDI file", long_about = None)]
struct Args {
    /// Path to the MIDI file (default: uses first .mid file in current directory)
    #[arg(short, long)]
    midi: Option<PathBuf>,

    /// Write the timeline to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress informational messages (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Number of count-in bars
    #[arg(short, long, default_value = "2")]
    prepare_bars: u32,

    /// Bars to announce, comma separated (e.g. 9,17,33)
    #[arg(short, long, value_delimiter = ',')]
    important: Vec<u32>,

    /// Print the timeline as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Find MIDI file
    let midi_path = if let Some(path) = args.midi {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path
    } else {
        find_first_midi_file()?
    };

    if !args.quiet {
        eprintln!("Processing MIDI file: {}", midi_path.display());
    }

    let score = ScoreData::from_file(&midi_path)?;
    let mut events = score
        .click_timeline(args.prepare_bars)
        .with_context(|| format!("Cannot build a click track for {}", midi_path.display()))?;
    BarAnnouncer::new(&args.important).annotate(&mut events);

    if !args.quiet {
        let opening = TempoChange::new(0, score.tempo_map().initial_tempo());
        eprintln!(
            "{} notes, {} clicks, {:.3}s, opening tempo {:.1} BPM",
            score.note_count,
            events.len(),
            events.last().map(|e| e.seconds()).unwrap_or(0.0),
            opening.bpm()
        );
    }

    let formatter = TimelineFormatter::new(args.json);
    let output = formatter
        .build_output(
            &events,
            &score.tempo_map().changes(),
            &normalize_meters(score.meter_changes()),
        )
        .context("Failed to serialize the timeline")?;

    match args.output {
        Some(output_path) => {
            fs::write(&output_path, format!("{}\n", output))
                .with_context(|| format!("Failed to write {}", output_path.display()))?;

            if !args.quiet {
                eprintln!("Output saved to {}", output_path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".")
        .context("Failed to read current directory")?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("mid") | Some("midi")
        ) {
            return Ok(path);
        }
    }

    anyhow::bail!("No MIDI files found in current directory")
}
