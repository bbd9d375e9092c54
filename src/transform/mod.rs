// src/transform/mod.rs

//! Document transforms: matrix narrowing, repeat injection and the
//! per-document rewrite that produces the minimum pipeline.

use std::path::{Path, PathBuf};

use serde_yaml::Mapping;

pub mod narrow;
pub mod repeat;
pub mod rewrite;

pub use narrow::{narrow, NarrowedJobs};
pub use repeat::{add_repeat, parallel_size};
pub use rewrite::{rewrite, RewriteInput};

/// The jobs to write back into one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenDocument {
    path: PathBuf,
    jobs: Mapping,
}

impl RewrittenDocument {
    pub fn new(path: impl Into<PathBuf>, jobs: Mapping) -> Self {
        Self {
            path: path.into(),
            jobs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jobs(&self) -> &Mapping {
        &self.jobs
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().filter_map(|k| k.as_str())
    }
}
