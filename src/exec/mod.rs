// src/exec/mod.rs

//! External tools the publish step drives.
//!
//! - [`command`] runs a process and captures its output.
//! - [`backend`] defines the [`VersionControl`] and [`CiRemote`] traits the
//!   rest of the crate talks to, so tests can swap in fakes.
//! - [`git`] and [`glab`] are the production implementations.

pub mod backend;
pub mod command;
pub mod git;
pub mod glab;

pub use backend::{BoxFuture, CiRemote, PipelineStatus, VersionControl};
pub use command::{run_command, CommandOutput};
pub use git::GitCli;
pub use glab::GlabCli;
