use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use minipipe::errors::{MinipipeError, Result};
use minipipe::exec::{BoxFuture, VersionControl};
use minipipe::fs::mock::{MockFileSystem, MockSnapshot};

/// Which `VersionControl` call to sabotage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStep {
    HeadCommit,
    CurrentBranch,
    Stash,
    StashPop,
    Add,
    Commit,
    Push,
    Reset,
}

impl GitStep {
    fn label(self) -> &'static str {
        match self {
            GitStep::HeadCommit => "head_commit",
            GitStep::CurrentBranch => "current_branch",
            GitStep::Stash => "stash",
            GitStep::StashPop => "stash_pop",
            GitStep::Add => "add",
            GitStep::Commit => "commit",
            GitStep::Push => "push",
            GitStep::Reset => "reset",
        }
    }
}

/// A commit recorded by [`FakeVcs`].
#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub id: String,
    pub message: String,
    pub no_verify: bool,
    /// Text of every file in the committed tree.
    pub files: BTreeMap<PathBuf, String>,
}

#[derive(Debug)]
struct State {
    branch: String,
    /// Tree of the initial commit, then one entry per commit made.
    history: Vec<(String, MockSnapshot)>,
    commits: Vec<FakeCommit>,
    stash: Option<MockSnapshot>,
    pushes: Vec<(String, String, String)>,
    calls: Vec<String>,
    fail_on: Option<GitStep>,
    panic_on: Option<GitStep>,
}

/// In-memory git over a [`MockFileSystem`].
///
/// The tree at construction time is the initial commit. `stash` and
/// `reset_hard` swap whole trees, which is enough to check that a run leaves
/// the working tree exactly as it found it.
#[derive(Debug, Clone)]
pub struct FakeVcs {
    fs: MockFileSystem,
    state: Arc<Mutex<State>>,
}

impl FakeVcs {
    pub fn new(fs: MockFileSystem, branch: &str) -> Self {
        let initial = fs.snapshot();
        Self {
            fs,
            state: Arc::new(Mutex::new(State {
                branch: branch.to_string(),
                history: vec![("c0".to_string(), initial)],
                commits: Vec::new(),
                stash: None,
                pushes: Vec::new(),
                calls: Vec::new(),
                fail_on: None,
                panic_on: None,
            })),
        }
    }

    /// Make `step` return an error.
    pub fn fail_on(self, step: GitStep) -> Self {
        self.lock().fail_on = Some(step);
        self
    }

    /// Make `step` panic.
    pub fn panic_on(self, step: GitStep) -> Self {
        self.lock().panic_on = Some(step);
        self
    }

    /// Every call made, in order, e.g. `["head_commit", "stash", ...]`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count(&self, step: GitStep) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == step.label())
            .count()
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.lock().commits.clone()
    }

    /// `(remote, branch, commit id)` per push.
    pub fn pushes(&self) -> Vec<(String, String, String)> {
        self.lock().pushes.clone()
    }

    pub fn head(&self) -> String {
        self.lock()
            .history
            .last()
            .map(|(id, _)| id.clone())
            .unwrap_or_default()
    }

    pub fn has_stash(&self) -> bool {
        self.lock().stash.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and apply any configured failure.
    fn enter(&self, step: GitStep) -> Result<()> {
        let (fail, panic) = {
            let mut state = self.lock();
            state.calls.push(step.label().to_string());
            (state.fail_on == Some(step), state.panic_on == Some(step))
        };
        if panic {
            panic!("fake git panicked during {}", step.label());
        }
        if fail {
            return Err(MinipipeError::Vcs(format!(
                "fake git failed during {}",
                step.label()
            )));
        }
        Ok(())
    }

    fn head_tree(state: &State) -> MockSnapshot {
        state
            .history
            .last()
            .map(|(_, tree)| tree.clone())
            .unwrap_or_default()
    }
}

impl VersionControl for FakeVcs {
    fn head_commit(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            self.enter(GitStep::HeadCommit)?;
            Ok(self.head())
        })
    }

    fn current_branch(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            self.enter(GitStep::CurrentBranch)?;
            Ok(self.lock().branch.clone())
        })
    }

    fn stash(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            self.enter(GitStep::Stash)?;
            let mut state = self.lock();
            let head = Self::head_tree(&state);
            let current = self.fs.snapshot();
            if current == head {
                return Ok(false);
            }
            state.stash = Some(current);
            self.fs.restore(head);
            Ok(true)
        })
    }

    fn stash_pop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(GitStep::StashPop)?;
            let stash = self.lock().stash.take();
            match stash {
                Some(tree) => {
                    self.fs.restore(tree);
                    Ok(())
                }
                None => Err(MinipipeError::Vcs("no stash entries found".to_string())),
            }
        })
    }

    fn add<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.enter(GitStep::Add) })
    }

    fn commit<'a>(&'a self, message: &'a str, no_verify: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(GitStep::Commit)?;
            let tree = self.fs.snapshot();
            let files = self.fs.file_contents();
            let mut state = self.lock();
            let id = format!("c{}", state.history.len());
            state.history.push((id.clone(), tree));
            state.commits.push(FakeCommit {
                id,
                message: message.to_string(),
                no_verify,
                files,
            });
            Ok(())
        })
    }

    fn force_push<'a>(&'a self, remote: &'a str, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(GitStep::Push)?;
            let mut state = self.lock();
            let head = state
                .history
                .last()
                .map(|(id, _)| id.clone())
                .unwrap_or_default();
            state
                .pushes
                .push((remote.to_string(), branch.to_string(), head));
            Ok(())
        })
    }

    fn reset_hard<'a>(&'a self, commit: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(GitStep::Reset)?;
            let mut state = self.lock();
            let Some(index) = state.history.iter().position(|(id, _)| id == commit) else {
                return Err(MinipipeError::Vcs(format!("unknown revision {commit}")));
            };
            state.history.truncate(index + 1);
            let tree = Self::head_tree(&state);
            self.fs.restore(tree);
            Ok(())
        })
    }
}
