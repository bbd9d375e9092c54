// src/fs/fingerprint.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Content hash over a set of files, used to check that a restore really
/// brought the CI documents back to their pre-run state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a deterministic hash over the contents of the given files.
    ///
    /// Order of `paths` does not matter; we sort them before hashing. Each
    /// path is mixed in as well, so moving content between files changes the
    /// result. Missing files hash as absent rather than failing.
    pub fn of_paths<I, P>(fs: &dyn FileSystem, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut hasher = Hasher::new();

        let mut paths_vec: Vec<PathBuf> =
            paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        paths_vec.sort();
        paths_vec.dedup();

        for path in paths_vec {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&[0]);
            if fs.is_file(&path) {
                debug!("hashing file {:?}", path);
                let contents = fs
                    .read_to_string(&path)
                    .with_context(|| format!("reading file for fingerprint: {:?}", path))?;
                hasher.update(&[1]);
                hasher.update(contents.as_bytes());
            } else {
                hasher.update(&[2]);
            }
        }

        let hash = hasher.finalize().to_hex().to_string();
        debug!(hash = %hash, "computed document fingerprint");
        Ok(Self(hash))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}
