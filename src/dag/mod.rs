// src/dag/mod.rs

//! The job reference graph and the questions asked of it.
//!
//! - [`graph`] holds every job of every document with its resolved
//!   references (`needs`, `dependencies`, `extends`).
//! - [`resolve`] computes dependency closures and the minimum job set.
//! - [`classify`] decides which jobs may be dropped at all.

pub mod classify;
pub mod graph;
pub mod resolve;

pub use classify::is_removable;
pub use graph::JobGraph;
pub use resolve::{minimum_job_set, resolve, MinimumJobSet};
