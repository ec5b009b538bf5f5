//! Minimal `log` backend for the command line tools.
//!
//! All records go to stderr, so that stdout carries nothing but trees.

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

pub struct MinimalLogger;

static MINIMAL_LOGGER: MinimalLogger = MinimalLogger;

impl log::Log for MinimalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_string = match record.level() {
            Level::Error => record.level().to_string().red(),
            Level::Warn => record.level().to_string().yellow(),
            Level::Info => record.level().to_string().cyan(),
            Level::Debug => record.level().to_string().purple(),
            Level::Trace => record.level().to_string().normal(),
        };

        eprintln!("{:<5} {}", level_string, record.args());
    }

    fn flush(&self) {}
}

/// Installs the [MinimalLogger] with the given maximum level.
///
/// # Errors
/// [SetLoggerError] if a logger was installed before.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&MINIMAL_LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Log level for the command line flags: warnings only by default.
pub fn level_for(progress: bool, verbose: bool) -> LevelFilter {
    match (progress, verbose) {
        (_, true) => LevelFilter::Debug,
        (true, false) => LevelFilter::Info,
        (false, false) => LevelFilter::Warn,
    }
}
