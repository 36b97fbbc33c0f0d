//! Tracing setup for processes embedding the dispatcher.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

/// Default log directive for this crate
pub const DEFAULT_LOG_DIRECTIVE: &str = "admission_dispatch=info";

/// Build the log filter from `RUST_LOG`, adding the crate's default level.
pub fn env_filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match DEFAULT_LOG_DIRECTIVE.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install a JSON `fmt` subscriber as the global default.
///
/// Returns an error when a global subscriber is already set.
pub fn init_tracing() -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
}
