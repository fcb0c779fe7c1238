//! Tracing initialization for binaries embedding the library.

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber and bridges `log` records into
/// tracing. The filter comes from `RUST_LOG` when set, otherwise from the
/// given default directive (e.g. `"info,formscan=debug"`).
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init(default_filter: &str) {
    if LogTracer::init().is_err() {
        // A logger is already installed; keep it.
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::debug!("Global tracing subscriber was already set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("info");
        init("debug");
    }
}
