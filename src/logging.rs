//! Logger setup for the pipesh binary.
//!
//! The engine only talks to the `log` facade. This wires the facade to
//! `simplelog`: a file when `[log] file` is set, stderr otherwise.

use crate::config::LogConfig;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;

/// Parse a level name; unknown names turn logging off
pub fn parse_level(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Off)
}

/// Raise a level by `steps` (one per `-v`), up to trace
pub fn raise(level: LevelFilter, steps: u8) -> LevelFilter {
    let levels = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    // -v means info even when the configured level is off
    let floor = match steps {
        0 => LevelFilter::Off,
        n => levels[(2 + n as usize).min(levels.len() - 1)],
    };
    level.max(floor)
}

/// Install the global logger. Best-effort: a logger that cannot be set up
/// leaves logging off.
pub fn init(config: &LogConfig, verbosity: u8) {
    let level = raise(parse_level(&config.level), verbosity);
    if level == LevelFilter::Off {
        return;
    }

    let log_config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        .build();

    let _ = match crate::config::expand_path(&config.file) {
        Some(path) => match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => WriteLogger::init(level, log_config, file),
            Err(e) => {
                eprintln!("pipesh: cannot open log file {}: {}", path.display(), e);
                return;
            }
        },
        None => TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto),
    };
}
