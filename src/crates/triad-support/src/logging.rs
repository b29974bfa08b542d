//! `tracing-subscriber` initialization.
//!
//! Hook binaries speak a strict stdin/stdout protocol with the calling agent
//! harness, so diagnostic logging must never touch stdout. Everything here
//! writes to stderr.

use std::env;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber for a long-running or CLI
/// process. Honors `RUST_LOG` if set, otherwise falls back to `default_level`.
///
/// Safe to call more than once per process (subsequent calls are no-ops);
/// tests that want logging can call this without worrying about the
/// single-global-subscriber restriction panicking the test.
pub fn init(default_level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize logging for a hook binary: defaults to `WARN` so a normal
/// invocation is silent, escalated to `DEBUG` by `TRIADS_HOOK_DEBUG`.
pub fn init_for_hook() {
    let level = if env::var("TRIADS_HOOK_DEBUG").is_ok() {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init(level);
}
