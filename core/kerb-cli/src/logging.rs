//! File logging for the kerb CLI.
//!
//! Quiet by default so command output stays clean. Set `KERB_DEBUG_LOG=1` to
//! write debug logs under `~/.kerb/logs/`; `RUST_LOG` selects a filter the
//! usual way.

use std::env;

use kerb_core::StoragePaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the file subscriber when logging is requested. The returned guard
/// must stay alive for the process lifetime or buffered lines are lost.
pub fn init(paths: &StoragePaths) -> Option<WorkerGuard> {
    let debug_enabled = env::var("KERB_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if !debug_enabled && env::var("RUST_LOG").is_err() {
        return None;
    }

    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let appender = tracing_appender::rolling::daily(paths.log_dir(), "kerb.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
