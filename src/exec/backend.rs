// src/exec/backend.rs

//! Traits for the version control and CI remote the publish step uses.
//!
//! The session only ever talks to these traits. Production code plugs in
//! [`GitCli`](super::GitCli) and [`GlabCli`](super::GlabCli); tests provide
//! fakes that record calls and operate on an in-memory filesystem.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The git operations needed to publish a throwaway commit and undo it.
pub trait VersionControl: Send + Sync {
    /// Full hash of the commit currently checked out.
    fn head_commit(&self) -> BoxFuture<'_, Result<String>>;

    fn current_branch(&self) -> BoxFuture<'_, Result<String>>;

    /// Stash uncommitted work. Returns `false` when there was nothing to
    /// stash.
    fn stash(&self) -> BoxFuture<'_, Result<bool>>;

    fn stash_pop(&self) -> BoxFuture<'_, Result<()>>;

    /// Stage everything under `path`.
    fn add<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<()>>;

    fn commit<'a>(&'a self, message: &'a str, no_verify: bool) -> BoxFuture<'a, Result<()>>;

    fn force_push<'a>(&'a self, remote: &'a str, branch: &'a str) -> BoxFuture<'a, Result<()>>;

    fn reset_hard<'a>(&'a self, commit: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// What the CI remote reports for a branch or commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    pub running: bool,
    /// Names of failed jobs, as the remote prints them.
    pub failed_jobs: Vec<String>,
    pub url: Option<String>,
}

/// The CI service hosting the pipelines.
pub trait CiRemote: Send + Sync {
    /// Fail unless the remote tooling is installed and authenticated.
    fn ensure_ready(&self) -> BoxFuture<'_, Result<()>>;

    /// Latest pipeline status for a branch or commit.
    fn pipeline_status<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<PipelineStatus>>;

    fn has_open_merge_request<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Start a pipeline for `branch`.
    fn run_pipeline<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<()>>;
}
