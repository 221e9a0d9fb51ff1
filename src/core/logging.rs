//! Logger setup for binaries and tests

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the global logger.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects debug output (state
/// transitions, navigation requests, hazards) over info (lifecycle only).
/// Safe to call more than once.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);
    builder.format_timestamp(None);

    // A logger may already be installed by another test.
    let _ = builder.try_init();
}
