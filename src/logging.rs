//! Diagnostic logging to stderr.
//!
//! Operator-facing progress goes to stdout with `println!`; `tracing` output
//! is for diagnostics and stays quiet unless `USAGE_SYNC_LOG` asks for more.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `usage_sync=debug`.
pub const LOG_ENV: &str = "USAGE_SYNC_LOG";

pub const DEFAULT_LEVEL: &str = "warn";

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_is_idempotent() {
        init_subscriber(DEFAULT_LEVEL);
        init_subscriber("debug");
    }
}
