//! Logger setup for the command-line tool.

use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};

/// Info by default, debug when verbose; `RUST_LOG` still wins.
pub fn init_logging(verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .try_init()
}
