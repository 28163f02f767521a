//! Diagnostics go to stderr; stdout carries only IPC responses.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_ENV: &str = "CLASSROOMD_LOG";
pub const DEFAULT_FILTER: &str = "classroomd=info";

/// Reads per-target levels from `CLASSROOMD_LOG`
/// (e.g. `CLASSROOMD_LOG=classroomd::store=debug`), falling back to
/// `classroomd=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}
