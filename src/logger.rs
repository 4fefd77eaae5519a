use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Writes log records to stderr as `HH:MM:SS LEVEL message`
pub struct Logger;

static LOGGER: Logger = Logger;

/// Install the logger; `level` caps what gets through
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Level for the `-q` / `-v` command line flags
pub fn level_for(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

impl Logger {
    pub fn format(&self, time: &str, level: Level, message: &str) -> String {
        format!("{} {:<5} {}", time, level, message)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Decoder internals are only interesting when they go wrong
        if metadata.target().starts_with("symphonia") {
            return metadata.level() <= Level::Warn;
        }
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        eprintln!("{}", self.format(&time, record.level(), &record.args().to_string()));
    }

    fn flush(&self) {}
}
