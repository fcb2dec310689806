//! Structured logging setup.
//!
//! Mirrors the teacher's tracing bootstrap: an `EnvFilter` driven by config,
//! falling back to `info` for our own crate and `warn` for dependencies.

use tracing_subscriber::{fmt, EnvFilter};

use crate::conf::LogLevel;

/// Installs the global `tracing` subscriber.
///
/// Safe to call once at process start; a second call is a no-op (the
/// underlying `set_global_default` error is swallowed, matching binaries
/// that may call this from both `main` and test harness setup).
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kamino={level},warn")));
    let _ = fmt().with_env_filter(filter).try_init();
}
