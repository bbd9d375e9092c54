// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem shared between clones.
///
/// Cloning hands out another handle to the same tree, so a test can keep one
/// handle while the document store owns another.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

/// Frozen copy of a [`MockFileSystem`] tree.
pub type MockSnapshot = BTreeMap<PathBuf, MockEntry>;

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        files.insert(path.clone(), MockEntry::File(content.into()));
        Self::link_into_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        if !files.contains_key(&path) {
            files.insert(path.clone(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(&mut files, &path);
        }
    }

    /// Copy of the whole tree, e.g. to emulate `git stash` / `git reset --hard`.
    pub fn snapshot(&self) -> MockSnapshot {
        self.lock().clone()
    }

    /// Replace the whole tree with a previous [`snapshot`](Self::snapshot).
    pub fn restore(&self, snapshot: MockSnapshot) {
        *self.lock() = snapshot;
    }

    /// Text contents of every file, keyed by path.
    pub fn file_contents(&self) -> BTreeMap<PathBuf, String> {
        self.lock()
            .iter()
            .filter_map(|(path, entry)| match entry {
                MockEntry::File(bytes) => {
                    Some((path.clone(), String::from_utf8_lossy(bytes).into_owned()))
                }
                MockEntry::Dir(_) => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn link_into_parent(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if parent == path {
            return;
        }
        if !files.contains_key(parent) {
            files.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(files, parent);
        }
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_files_create_parent_dirs() {
        let fs = MockFileSystem::new();
        fs.add_file("ci/jobs/a.yml", "a: {}");

        assert!(fs.is_dir(Path::new("ci")));
        assert!(fs.is_dir(Path::new("ci/jobs")));
        assert_eq!(
            fs.read_dir(Path::new("ci/jobs")).unwrap(),
            vec![PathBuf::from("ci/jobs/a.yml")]
        );
    }

    #[test]
    fn snapshot_and_restore_undo_writes() {
        let fs = MockFileSystem::new();
        fs.add_file("ci/a.yml", "a: 1");
        let snap = fs.snapshot();

        fs.write(Path::new("ci/a.yml"), b"a: 2").unwrap();
        fs.write(Path::new("ci/b.yml"), b"b: 1").unwrap();
        fs.restore(snap);

        assert_eq!(fs.read_to_string(Path::new("ci/a.yml")).unwrap(), "a: 1");
        assert!(!fs.exists(Path::new("ci/b.yml")));
    }

    #[test]
    fn clones_share_the_tree() {
        let fs = MockFileSystem::new();
        let other = fs.clone();
        other.add_file("x.yml", "x: 1");
        assert!(fs.is_file(Path::new("x.yml")));
    }
}
