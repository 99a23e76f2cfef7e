//! Logging initialization
//!
//! `RUST_LOG` always takes precedence over the verbosity picked here.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Default filter for a verbosity level (number of `-v` flags)
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "my_closet=info",
        1 => "my_closet=debug",
        _ => "my_closet=trace",
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: u8) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
        // Another subscriber may already be installed by an embedding host
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
