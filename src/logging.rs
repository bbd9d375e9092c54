// src/logging.rs

//! Logging setup for `minipipe` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--debug` (same as `--log-level debug`)
//! 3. `MINIPIPE_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that `--dry-run` output on stdout stays
//! machine-readable.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, debug: bool) -> Result<()> {
    let level = resolve_level(cli_level, debug, std::env::var("MINIPIPE_LOG").ok());

    fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>, debug: bool, env: Option<String>) -> tracing::Level {
    match (cli_level, debug) {
        (Some(lvl), _) => level_from_log_level(lvl),
        (None, true) => tracing::Level::DEBUG,
        (None, false) => env
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_debug_and_env() {
        let level = resolve_level(Some(LogLevel::Warn), true, Some("trace".into()));
        assert_eq!(level, tracing::Level::WARN);
    }

    #[test]
    fn debug_flag_wins_over_env() {
        let level = resolve_level(None, true, Some("error".into()));
        assert_eq!(level, tracing::Level::DEBUG);
    }

    #[test]
    fn env_then_default() {
        assert_eq!(resolve_level(None, false, Some(" Warning ".into())), tracing::Level::WARN);
        assert_eq!(resolve_level(None, false, Some("bogus".into())), tracing::Level::INFO);
        assert_eq!(resolve_level(None, false, None), tracing::Level::INFO);
    }
}
