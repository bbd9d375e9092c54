// src/engine/mod.rs

//! Publishing a rewritten pipeline as a throwaway commit.
//!
//! The pure planning happens in [`crate::plan`]; this module owns the part
//! that touches the working tree and the remotes:
//!
//! - [`restore`] captures the pre-run state and puts it back.
//! - [`publish`] runs write, commit, push and pipeline start as one
//!   transaction that always ends with a restore.

pub mod publish;
pub mod restore;

pub use publish::{commit_message, PublishOptions, Publisher};
pub use restore::RestorePoint;
