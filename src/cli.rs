// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `minipipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "minipipe",
    version,
    about = "Push a throwaway commit whose GitLab CI config only runs the given (or last failed) jobs.",
    long_about = "Reduces the CI job graph to the jobs needed by the targets, narrows matrix \
                  jobs to the requested sub-jobs, optionally repeats them, pushes the result \
                  as a throwaway commit and restores the working tree afterwards.\n\n\
                  Job format: `job`, `job:[subjob]`. Example: minipipe -j 'lint:[python], build'"
)]
pub struct CliArgs {
    /// Comma separated target jobs, e.g. "test:[f1], lint".
    ///
    /// When omitted, the failed jobs of the last pipeline are used.
    #[arg(short = 'j', long, value_name = "LIST")]
    pub jobs: Option<String>,

    /// Branch or commit to read failed jobs from.
    #[arg(short = 'f', long, value_name = "REF", default_value = "HEAD")]
    pub failed_from: String,

    /// Run each target this many times (`-r 2` adds `REPEAT: [0, 1]`).
    ///
    /// Sub-jobs times repeat must stay under the platform limit (200).
    #[arg(short = 'r', long, value_name = "N", default_value_t = 0)]
    pub repeat: u32,

    /// Pass `--no-verify` to `git commit`.
    #[arg(short = 'n', long)]
    pub no_verify: bool,

    /// Show detailed debug messages (same as `--log-level debug`).
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MINIPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Path to the config file (TOML). Missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Minipipe.toml")]
    pub config: String,

    /// Directory holding the CI documents; overrides `[config].ci_dir`.
    #[arg(long, value_name = "DIR")]
    pub ci_dir: Option<String>,

    /// Resolve and print the reduced documents, but don't touch git or disk.
    #[arg(long)]
    pub dry_run: bool,

    /// Answer "yes" to every confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
