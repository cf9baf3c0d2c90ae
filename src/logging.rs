//! Logging configuration and initialization.
//!
//! Uses tracing with environment-based filtering and optional JSON file
//! output, the same shape the engine's run log uses for its own
//! transcript file (see `accounting::RunLog`).

use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::Result;
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, prelude::*};

/// Initialize logging for a binary.
///
/// Honors `RUST_LOG` if set; otherwise a default filter is derived from
/// verbosity and quiet flags.
///
/// `log_file` is the engine CLI's `-l FILE` alternate run-log sink
/// (spec.md §6, used by the launcher). `debug_file` is the `DebugFile`
/// config key (spec.md §4.1/§4.7): when debug output is enabled and a
/// `DebugFile` is configured, debug-level traces are additionally
/// appended there instead of relying on the stderr sink alone.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(
    verbosity: u8,
    quiet: bool,
    log_file: Option<&Path>,
    debug_enabled: bool,
    debug_file: Option<&Path>,
) -> Result<()> {
    let env_filter = resolve_env_filter(verbosity, quiet)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_ansi(std::io::stderr().is_terminal());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    let run_log_layer = log_file
        .map(std::fs::File::create)
        .transpose()?
        .map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .json()
        });

    // Append (not truncate/overwrite) so a long-running debug session
    // accumulates rather than losing earlier traces on each restart.
    let debug_layer = if debug_enabled {
        debug_file
            .map(|path| std::fs::OpenOptions::new().create(true).append(true).open(path))
            .transpose()?
            .map(|file| {
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::DEBUG)
            })
    } else {
        None
    };

    tracing::subscriber::set_global_default(registry.with(run_log_layer).with(debug_layer))?;

    Ok(())
}

fn resolve_env_filter(verbosity: u8, quiet: bool) -> Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))?;
    Ok(filter)
}

#[cfg(test)]
fn resolve_env_filter_with_override(
    verbosity: u8,
    quiet: bool,
    env_override: Option<&str>,
) -> Result<EnvFilter> {
    if let Some(value) = env_override {
        let filter = EnvFilter::try_new(value)
            .or_else(|_| EnvFilter::try_new(default_filter(verbosity, quiet)))?;
        return Ok(filter);
    }
    resolve_env_filter(verbosity, quiet)
}

fn default_filter(verbosity: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }

    match verbosity {
        0 => {
            if cfg!(debug_assertions) {
                "snapback=debug".to_string()
            } else {
                "snapback=info".to_string()
            }
        }
        1 => "snapback=debug".to_string(),
        2 => "snapback=debug,snapback::command=trace".to_string(),
        _ => "snapback=trace".to_string(),
    }
}

/// Initialize logging for tests with the test writer. Safe to call more
/// than once; only the first call installs a subscriber.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("snapback=debug,test=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT_LOGGING: Once = Once::new();

    #[test]
    fn default_filter_respects_quiet() {
        assert_eq!(default_filter(0, true), "error");
    }

    #[test]
    fn default_filter_varies_with_verbosity() {
        assert_eq!(default_filter(1, false), "snapback=debug");
        assert_eq!(
            default_filter(2, false),
            "snapback=debug,snapback::command=trace"
        );
        assert_eq!(default_filter(3, false), "snapback=trace");
    }

    #[test]
    fn resolve_env_filter_prefers_rust_log() {
        let filter =
            resolve_env_filter_with_override(0, false, Some("snapback=trace")).expect("filter");
        let rendered = filter.to_string();
        assert!(
            rendered.contains("snapback=trace"),
            "expected env override to include trace, got {rendered}"
        );
    }

    #[test]
    fn resolve_env_filter_falls_back_on_invalid_env() {
        let filter = resolve_env_filter_with_override(1, false, Some("[invalid"))
            .expect("fallback filter");
        let rendered = filter.to_string();
        assert!(
            rendered.contains("snapback=debug"),
            "expected fallback filter, got {rendered}"
        );
    }

    #[test]
    fn init_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn debug_file_is_skipped_when_debug_disabled() {
        // Asserted indirectly: init_logging must not error just because a
        // debug_file path is supplied while debug_enabled is false. The
        // global-subscriber-already-set error from other tests in this
        // process is the only expected failure mode.
        let temp = tempfile::NamedTempFile::new().expect("temp debug file");
        let result = init_logging(0, false, None, false, Some(temp.path()));
        if let Err(err) = result {
            let message = err.to_string();
            assert!(
                message.contains("global") || message.contains("already") || message.contains("set"),
                "unexpected init_logging error: {message}"
            );
        }
    }

    #[test]
    fn init_logging_does_not_panic() {
        let result = std::panic::catch_unwind(|| {
            INIT_LOGGING.call_once(|| {
                let temp = tempfile::NamedTempFile::new().expect("temp log file");
                let result = init_logging(0, false, Some(temp.path()), false, None);
                if let Err(err) = result {
                    let message = err.to_string();
                    let is_already_set = message.contains("global")
                        || message.contains("already")
                        || message.contains("set");
                    assert!(is_already_set, "unexpected init_logging error: {message}");
                }
            });
        });
        assert!(result.is_ok());
    }
}
