//! Log setup for the command-line tool.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TOPEXPECT_LOG=debug`.
pub const LOG_ENV: &str = "TOPEXPECT_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr subscriber filtered by `TOPEXPECT_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
