//! Terminal and optional file logging for the action service.
//!
//! The load test binaries leave logging to Goose, which configures the same
//! [`simplelog`](https://docs.rs/simplelog/) loggers from its own `-v`, `-q` and
//! `-g` options.

use simplelog::*;
use std::fs::File;
use std::path::PathBuf;

use crate::DemoError;

/// Maps `-v`/`-q` counts onto a terminal log level.
pub fn terminal_level(verbose: u8, quiet: u8) -> LevelFilter {
    match verbose {
        0 => match quiet {
            0 => LevelFilter::Info,
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        },
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the logger writing to standard out, and also to `log_file` when
/// it is not empty. The file always logs at least at the terminal's level of
/// detail, and never less than info.
pub fn initialize_logger(verbose: u8, quiet: u8, log_file: &str) -> Result<(), DemoError> {
    let debug_level = terminal_level(verbose, quiet);
    let file_level = std::cmp::max(debug_level, LevelFilter::Info);

    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![SimpleLogger::new(debug_level, Config::default())];

    let log_to_file = if !log_file.is_empty() {
        Some(PathBuf::from(log_file))
    } else {
        None
    };
    if let Some(path) = &log_to_file {
        loggers.push(WriteLogger::new(
            file_level,
            Config::default(),
            File::create(path)?,
        ));
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        info!("failed to initialize CombinedLogger: {}", e);
    }
    if let Some(path) = log_to_file {
        info!("Writing to log file: {}", path.display());
    }
    info!("Output verbosity level: {}", debug_level);

    Ok(())
}
