//! Tracing subscriber setup for the CLI and bindings

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

/// Install a compact fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// Idempotent: the first call installs the subscriber, later calls are no-ops.
pub fn init_tracing(default_level: &str) {
    let filter_str = format!("{default_level},dice_loot_lib={default_level}");
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact();

        // Another subscriber (e.g. a host application's) may already be set
        let _ = subscriber.try_init();
    });
}

/// Map the CLI's `-v` count to a level name.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
    }
}
