//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The level comes from `ASSETPIPE_LOG` when set (any `EnvFilter` directive,
//! e.g. `debug` or `assetpipe=trace`), otherwise from the verbosity flags.
//! Logs go to stderr so tool output on stdout stays clean.

use crate::runner::Verbosity;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "ASSETPIPE_LOG";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Silent => "off",
        Verbosity::Quiet => "error",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(Verbosity::Silent), "off");
        assert_eq!(default_directive(Verbosity::Quiet), "error");
        assert_eq!(default_directive(Verbosity::Normal), "info");
        assert_eq!(default_directive(Verbosity::Verbose), "debug");
    }
}
