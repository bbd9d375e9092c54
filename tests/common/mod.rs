#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use minipipe::cli::CliArgs;
use minipipe::config::ConfigFile;
use minipipe::fs::mock::MockFileSystem;
use minipipe::fs::FileSystem;
use minipipe::Collaborators;
use minipipe_test_utils::{ci_file_system, FakeRemote, FakeVcs, ScriptedConfirm, CI_DIR};

pub use minipipe_test_utils::init_tracing;

pub const BRANCH: &str = "feature/flaky-test";

/// Parse CLI args the way the binary would.
pub fn args(argv: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("minipipe").chain(argv.iter().copied()))
}

/// Default config without the post-push pause.
pub fn config() -> ConfigFile {
    ConfigFile::default().with_settle_secs(0)
}

/// A repository whose CI documents live in the mock filesystem, with fake
/// git, remote and prompts wired around it.
pub struct Harness {
    pub fs: MockFileSystem,
    pub vcs: FakeVcs,
    pub remote: FakeRemote,
    pub confirm: ScriptedConfirm,
}

impl Harness {
    pub fn new(files: &[(&str, &str)]) -> Self {
        init_tracing();
        let fs = ci_file_system(files);
        let vcs = FakeVcs::new(fs.clone(), BRANCH);
        Self {
            fs,
            vcs,
            remote: FakeRemote::new(),
            confirm: ScriptedConfirm::default(),
        }
    }

    pub fn with_vcs(mut self, f: impl FnOnce(FakeVcs) -> FakeVcs) -> Self {
        self.vcs = f(self.vcs);
        self
    }

    pub fn with_remote(mut self, f: impl FnOnce(FakeRemote) -> FakeRemote) -> Self {
        self.remote = f(self.remote);
        self
    }

    pub fn with_answers(mut self, answers: &[bool]) -> Self {
        self.confirm = ScriptedConfirm::new(answers);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fs: Arc::new(self.fs.clone()),
            vcs: Arc::new(self.vcs.clone()),
            remote: Arc::new(self.remote.clone()),
            confirm: Arc::new(self.confirm.clone()),
        }
    }

    /// Text of a CI document as it is in the working tree now.
    pub fn document(&self, name: &str) -> String {
        self.fs
            .read_to_string(&Path::new(CI_DIR).join(name))
            .unwrap()
    }
}
