// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Validation errors (`JobNotFound`, the structural sub-job errors,
//! `MalformedTarget`, `NoTargets`, ...) are raised before any document is
//! touched. Errors raised while publishing are reported only after the
//! working tree has been restored.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinipipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(
        "Job name [{0}] not found! Check the spelling; sub-jobs are written as 'job:[subjob]'"
    )]
    JobNotFound(String),

    #[error("There is no `parallel` section in job '{0}'")]
    NoParallel(String),

    #[error("There is no `matrix` in the `parallel` section of job '{0}'")]
    NoMatrix(String),

    #[error("Sub-job '{subjob}' not found in the matrix of job '{job}'")]
    SubJobNotFound { job: String, subjob: String },

    #[error("Multiple ':[' in one job name, please check target '{0}'")]
    MalformedTarget(String),

    #[error("There is no target job to generate a pipeline for")]
    NoTargets,

    #[error("There is no failed job in branch/commit '{0}'")]
    NoFailedJobs(String),

    #[error("Cycle detected in job references: {0}")]
    DependencyCycle(String),

    #[error("Job '{job}' is defined in both '{first}' and '{second}'")]
    DuplicateJob {
        job: String,
        first: String,
        second: String,
    },

    #[error(
        "Job '{job}' would run {size} parallel instances, above the limit of {limit}; lower the repeat count"
    )]
    ParallelLimit { job: String, size: u64, limit: u64 },

    #[error("Invalid CI document {path:?}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("Unknown YAML tag '{tag}' in {document}")]
    UnknownTag { tag: String, document: String },

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Remote CI error: {0}")]
    Remote(String),

    #[error(
        "Recovery failed ({reason}); reset back to commit {commit}{}",
        stash_hint(.stashed)
    )]
    Restore {
        commit: String,
        stashed: bool,
        reason: String,
    },

    #[error("Unexpected failure while publishing: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn stash_hint(stashed: &bool) -> &'static str {
    if *stashed { " and apply/pop the stash" } else { "" }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MinipipeError>;
